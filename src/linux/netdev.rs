use std::ffi::CStr;
use std::io;
use std::ptr;

use crate::core::netdev::{
    AddressFamily,
    Control,
    IfEntry,
    System,
};
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::linux::libc as _libc;

/// Interface enumeration and queries backed by getifaddrs(3) and
/// [netdevice](https://linux.die.net/man/7/netdevice) ioctls.
#[derive(Clone, Copy, Debug, Default)]
pub struct Linux;

impl Linux {
    pub fn new() -> Linux {
        Linux
    }
}

impl System for Linux {
    type Control = ControlSocket;

    fn open_control(&self) -> io::Result<ControlSocket> {
        ControlSocket::open()
    }

    fn interfaces(&self) -> io::Result<Vec<IfEntry>> {
        let ifaddrs = IfAddrs::new()?;
        Ok(ifaddrs.entries())
    }
}

/// A datagram socket used only to issue interface ioctls, closed on drop.
#[derive(Debug)]
pub struct ControlSocket {
    fd: libc::c_int,
}

impl ControlSocket {
    fn open() -> io::Result<ControlSocket> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };

        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(ControlSocket { fd })
    }

    fn ioctl(&self, request: libc::c_ulong, ifname: &str) -> io::Result<_libc::c_ifreq> {
        let mut ifreq = _libc::c_ifreq::with_name(ifname)?;

        if unsafe { libc::ioctl(self.fd, request, &mut ifreq as *mut _libc::c_ifreq) } == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(ifreq)
    }
}

impl Control for ControlSocket {
    fn wireless_protocol(&self, ifname: &str) -> io::Result<String> {
        let ifreq = self.ioctl(_libc::SIOCGIWNAME, ifname)?;
        Ok(_libc::c_str_lossy(unsafe { &ifreq.ifr_ifru.ifr_newname }))
    }

    fn is_up(&self, ifname: &str) -> io::Result<bool> {
        let ifreq = self.ioctl(_libc::SIOCGIFFLAGS, ifname)?;
        Ok(unsafe { ifreq.ifr_ifru.ifr_flags } & _libc::IFF_UP != 0)
    }

    fn hardware_addr(&self, ifname: &str) -> io::Result<EthernetAddress> {
        let ifreq = self.ioctl(_libc::SIOCGIFHWADDR, ifname)?;
        let c_addr = unsafe { ifreq.ifr_ifru.ifr_hwaddr };

        if c_addr.sa_family != _libc::ARPHRD_ETHER {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has no Ethernet address", ifname),
            ));
        }

        let mut buffer = [0 as u8; 6];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = c_addr.sa_data[i] as u8;
        }

        Ok(EthernetAddress::new(buffer))
    }

    fn ipv4_addr(&self, ifname: &str) -> io::Result<Ipv4Address> {
        let ifreq = self.ioctl(_libc::SIOCGIFADDR, ifname)?;
        let c_addr = unsafe { ifreq.ifr_ifru.ifr_addr };

        if c_addr.sa_family != libc::AF_INET as libc::sa_family_t {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has no IPv4 address", ifname),
            ));
        }

        let c_addr_in =
            unsafe { ptr::read(&c_addr as *const libc::sockaddr as *const libc::sockaddr_in) };

        Ok(Ipv4Address::new(c_addr_in.sin_addr.s_addr.to_ne_bytes()))
    }

    fn index(&self, ifname: &str) -> io::Result<u32> {
        let ifreq = self.ioctl(_libc::SIOCGIFINDEX, ifname)?;
        Ok(unsafe { ifreq.ifr_ifru.ifr_ifindex } as u32)
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// The list returned by getifaddrs(3), freed on drop.
struct IfAddrs {
    head: *mut libc::ifaddrs,
}

impl IfAddrs {
    fn new() -> io::Result<IfAddrs> {
        let mut head = ptr::null_mut();

        if unsafe { libc::getifaddrs(&mut head) } == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(IfAddrs { head })
    }

    fn entries(&self) -> Vec<IfEntry> {
        let mut entries = Vec::new();
        let mut ifaddr = self.head;

        while !ifaddr.is_null() {
            let (name, family) = unsafe {
                let name = CStr::from_ptr((*ifaddr).ifa_name)
                    .to_string_lossy()
                    .into_owned();
                let family = if (*ifaddr).ifa_addr.is_null() {
                    None
                } else {
                    Some(address_family((*(*ifaddr).ifa_addr).sa_family))
                };
                (name, family)
            };

            entries.push(IfEntry { name, family });
            ifaddr = unsafe { (*ifaddr).ifa_next };
        }

        entries
    }
}

impl Drop for IfAddrs {
    fn drop(&mut self) {
        unsafe {
            libc::freeifaddrs(self.head);
        }
    }
}

fn address_family(family: libc::sa_family_t) -> AddressFamily {
    match family as libc::c_int {
        libc::AF_PACKET => AddressFamily::Packet,
        libc::AF_INET => AddressFamily::Inet,
        libc::AF_INET6 => AddressFamily::Inet6,
        _ => AddressFamily::Other(family as u16),
    }
}
