//! Hand assembly and validation of raw Ethernet/IPv4/UDP frames, plus
//! discovery of the local wireless interface to bind to.

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
extern crate libc;
#[macro_use]
extern crate log;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};

#[derive(Debug)]
pub enum Error {
    /// Indicates that no wireless interface is both present and up.
    NoInterface,
    /// Indicates an error creating the socket used for interface queries.
    Socket(std::io::Error),
    /// Indicates an error enumerating the system interfaces.
    Enumeration(std::io::Error),
    /// Indicates an interface index outside the discovered range.
    Index,
    /// Indicates an error querying the hardware address of an interface.
    HardwareAddress(std::io::Error),
    /// Indicates an error querying the OS index of an interface.
    InterfaceIndex(std::io::Error),
    /// Indicates an error creating the socket used to look up the source
    /// address of an IPv4 header.
    HeaderSocket(std::io::Error),
    /// Indicates an interface without an assigned IPv4 address.
    NoSourceAddress,
    /// Indicates an error where an address could not be parsed.
    Address,
    /// Indicates an error where a buffer is too small.
    Exhausted,
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl Error {
    /// Returns the signed sentinel code historically used for this outcome.
    pub fn code(&self) -> i32 {
        match *self {
            Error::NoInterface => 0,
            Error::Socket(_) => -1,
            Error::Enumeration(_) => -2,
            Error::Index => -3,
            Error::HardwareAddress(_) => -4,
            Error::InterfaceIndex(_) => -5,
            Error::HeaderSocket(_) => -10,
            Error::NoSourceAddress => -11,
            Error::Address => -20,
            Error::Exhausted => -21,
            Error::IO(_) => -22,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match *self {
            Error::NoInterface => write!(f, "no WLAN interfaces found"),
            Error::Socket(ref err) => write!(f, "socket creation error: {}", err),
            Error::Enumeration(ref err) => write!(f, "getifaddrs() error: {}", err),
            Error::Index => write!(f, "wrong index specified"),
            Error::HardwareAddress(ref err) => {
                write!(f, "unable to get source MAC address: {}", err)
            }
            Error::InterfaceIndex(ref err) => write!(f, "unable to get interface index: {}", err),
            Error::HeaderSocket(ref err) => {
                write!(f, "socket creation error while populating IP header: {}", err)
            }
            Error::NoSourceAddress => write!(f, "unable to retrieve source IP address"),
            Error::Address => write!(f, "malformed address"),
            Error::Exhausted => write!(f, "buffer too small"),
            Error::IO(ref err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Socket(ref err)
            | Error::Enumeration(ref err)
            | Error::HardwareAddress(ref err)
            | Error::InterfaceIndex(ref err)
            | Error::HeaderSocket(ref err)
            | Error::IO(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
