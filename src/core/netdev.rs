//! Abstractions over the operating system facilities used to enumerate and
//! query network interfaces.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::{
    Error,
    Result,
};

/// Address family of an enumerated interface address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    /// Link layer (packet) address, one per interface.
    Packet,
    Inet,
    Inet6,
    Other(u16),
}

/// A single record of an interface enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfEntry {
    pub name: String,
    /// None if the record carries no address.
    pub family: Option<AddressFamily>,
}

/// A transient handle used to issue interface control queries. The handle is
/// released when dropped.
pub trait Control {
    /// Returns the wireless protocol name of the interface, failing if the
    /// interface is not wireless capable.
    fn wireless_protocol(&self, ifname: &str) -> io::Result<String>;

    /// Checks if the interface is administratively up.
    fn is_up(&self, ifname: &str) -> io::Result<bool>;

    /// Returns the hardware address of the interface.
    fn hardware_addr(&self, ifname: &str) -> io::Result<EthernetAddress>;

    /// Returns the IPv4 address currently assigned to the interface.
    fn ipv4_addr(&self, ifname: &str) -> io::Result<Ipv4Address>;

    /// Returns the OS level index of the interface.
    fn index(&self, ifname: &str) -> io::Result<u32>;
}

/// The operating system facilities for interface discovery.
pub trait System {
    type Control: Control;

    /// Creates a control handle.
    fn open_control(&self) -> io::Result<Self::Control>;

    /// Enumerates every interface address record, in system order.
    fn interfaces(&self) -> io::Result<Vec<IfEntry>>;
}

/// Queries the IPv4 address currently assigned to an interface.
pub fn interface_ipv4_addr<S: System>(system: &S, ifname: &str) -> Result<Ipv4Address> {
    let control = system.open_control().map_err(Error::HeaderSocket)?;

    control.ipv4_addr(ifname).map_err(|err| {
        debug!("No IPv4 address for {} with {}.", ifname, err);
        Error::NoSourceAddress
    })
}

/// An interface known to a MockSystem.
#[derive(Clone, Debug)]
pub struct MockInterface {
    pub name: String,
    pub family: Option<AddressFamily>,
    pub wireless: bool,
    pub up: bool,
    pub hardware_addr: Option<EthernetAddress>,
    pub ipv4_addr: Option<Ipv4Address>,
    pub index: Option<u32>,
}

/// An in memory system with a configurable set of interfaces.
#[derive(Clone, Debug, Default)]
pub struct MockSystem {
    pub interfaces: Vec<MockInterface>,
    pub socket_failure: bool,
    pub enumeration_failure: bool,
    open_controls: Rc<Cell<usize>>,
}

impl MockSystem {
    pub fn new() -> MockSystem {
        MockSystem::default()
    }

    /// Hardware address given to the i-th interface added.
    pub fn ethernet_addr_for(i: usize) -> EthernetAddress {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, i as u8])
    }

    /// IPv4 address given to the i-th interface added.
    pub fn ipv4_addr_for(i: usize) -> Ipv4Address {
        Ipv4Address::new([10, 0, 0, (i + 1) as u8])
    }

    /// Adds a fully addressed interface with a packet family record.
    pub fn with_interface(mut self, name: &str, wireless: bool, up: bool) -> MockSystem {
        let i = self.interfaces.len();
        self.interfaces.push(MockInterface {
            name: name.to_string(),
            family: Some(AddressFamily::Packet),
            wireless,
            up,
            hardware_addr: Some(Self::ethernet_addr_for(i)),
            ipv4_addr: Some(Self::ipv4_addr_for(i)),
            index: Some((i + 1) as u32),
        });
        self
    }

    pub fn with_wireless(self, name: &str, up: bool) -> MockSystem {
        self.with_interface(name, true, up)
    }

    pub fn with_wired(self, name: &str) -> MockSystem {
        self.with_interface(name, false, true)
    }

    pub fn with_socket_failure(mut self) -> MockSystem {
        self.socket_failure = true;
        self
    }

    pub fn with_enumeration_failure(mut self) -> MockSystem {
        self.enumeration_failure = true;
        self
    }

    /// Returns a mutable reference to a previously added interface.
    pub fn interface_mut(&mut self, name: &str) -> Option<&mut MockInterface> {
        self.interfaces.iter_mut().find(|interface| interface.name == name)
    }

    /// Returns the number of control handles not yet released.
    pub fn open_controls(&self) -> usize {
        self.open_controls.get()
    }
}

impl System for MockSystem {
    type Control = MockControl;

    fn open_control(&self) -> io::Result<MockControl> {
        if self.socket_failure {
            return Err(io::Error::new(io::ErrorKind::Other, "socket failure"));
        }

        self.open_controls.set(self.open_controls.get() + 1);

        Ok(MockControl {
            interfaces: self.interfaces.clone(),
            open_controls: self.open_controls.clone(),
        })
    }

    fn interfaces(&self) -> io::Result<Vec<IfEntry>> {
        if self.enumeration_failure {
            return Err(io::Error::new(io::ErrorKind::Other, "enumeration failure"));
        }

        Ok(self
            .interfaces
            .iter()
            .map(|interface| IfEntry {
                name: interface.name.clone(),
                family: interface.family,
            })
            .collect())
    }
}

/// Control handle of a MockSystem.
#[derive(Debug)]
pub struct MockControl {
    interfaces: Vec<MockInterface>,
    open_controls: Rc<Cell<usize>>,
}

impl MockControl {
    fn find<F, R>(&self, ifname: &str, f: F) -> io::Result<R>
    where
        F: FnOnce(&MockInterface) -> Option<R>,
    {
        self.interfaces
            .iter()
            .find(|interface| interface.name == ifname)
            .and_then(f)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, ifname.to_string()))
    }
}

impl Control for MockControl {
    fn wireless_protocol(&self, ifname: &str) -> io::Result<String> {
        self.find(ifname, |interface| {
            if interface.wireless {
                Some("IEEE 802.11".to_string())
            } else {
                None
            }
        })
    }

    fn is_up(&self, ifname: &str) -> io::Result<bool> {
        self.find(ifname, |interface| Some(interface.up))
    }

    fn hardware_addr(&self, ifname: &str) -> io::Result<EthernetAddress> {
        self.find(ifname, |interface| interface.hardware_addr)
    }

    fn ipv4_addr(&self, ifname: &str) -> io::Result<Ipv4Address> {
        self.find(ifname, |interface| interface.ipv4_addr)
    }

    fn index(&self, ifname: &str) -> io::Result<u32> {
        self.find(ifname, |interface| interface.index)
    }
}

impl Drop for MockControl {
    fn drop(&mut self) {
        self.open_controls.set(self.open_controls.get() - 1);
    }
}
