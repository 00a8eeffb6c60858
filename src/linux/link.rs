use std::io;
use std::mem;

use crate::core::link::Link;
use crate::linux::libc as _libc;
use crate::{
    Error,
    Result,
};

/// A [packet socket](http://man7.org/linux/man-pages/man7/packet.7.html)
/// bound to a single interface, sending and receiving complete Ethernet
/// frames.
#[derive(Debug)]
pub struct PacketSocket {
    fd: libc::c_int,
    ifindex: u32,
}

impl PacketSocket {
    /// Opens a raw packet socket receiving every protocol and binds it to the
    /// interface with the OS index ifindex.
    pub fn bind(ifindex: u32) -> Result<PacketSocket> {
        let protocol = (_libc::ETH_P_ALL as u16).to_be();

        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, protocol as libc::c_int) };

        if fd == -1 {
            return Err(Error::Socket(io::Error::last_os_error()));
        }

        // Closes the socket if binding fails.
        let socket = PacketSocket { fd, ifindex };

        unsafe {
            let mut addr: libc::sockaddr_ll = mem::zeroed();
            addr.sll_family = libc::AF_PACKET as libc::c_ushort;
            addr.sll_protocol = protocol;
            addr.sll_ifindex = ifindex as libc::c_int;

            if libc::bind(
                socket.fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            ) == -1
            {
                return Err(Error::IO(io::Error::last_os_error()));
            }
        }

        debug!("Bound packet socket {} to interface {}.", socket.fd, ifindex);

        Ok(socket)
    }

    /// Returns the OS index of the bound interface.
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Allows or forbids sending to broadcast addresses.
    pub fn set_broadcast(&mut self, broadcast: bool) -> Result<()> {
        let value = broadcast as libc::c_int;

        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_BROADCAST,
                &value as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };

        if ret == -1 {
            return Err(Error::IO(io::Error::last_os_error()));
        }

        Ok(())
    }
}

impl Link for PacketSocket {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        let wrote = unsafe {
            libc::send(
                self.fd,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
                0,
            )
        };

        if wrote < 0 {
            Err(Error::IO(io::Error::last_os_error()))
        } else if wrote as usize != buffer.len() {
            Err(Error::IO(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", wrote, buffer.len()),
            )))
        } else {
            Ok(())
        }
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let read = unsafe {
            libc::recv(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
            )
        };

        if read < 0 {
            Err(Error::IO(io::Error::last_os_error()))
        } else {
            Ok(read as usize)
        }
    }
}

impl Drop for PacketSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
