use std::io;

pub const ETH_P_ALL: libc::c_int = 0x0003;

pub const ARPHRD_ETHER: libc::c_ushort = 1;

pub const IFF_UP: libc::c_short = 0x0001;

pub const SIOCGIFFLAGS: libc::c_ulong = 0x8913;

pub const SIOCGIFADDR: libc::c_ulong = 0x8915;

pub const SIOCGIFHWADDR: libc::c_ulong = 0x8927;

pub const SIOCGIFINDEX: libc::c_ulong = 0x8933;

/// [https://github.com/torvalds/linux/blob/master/include/uapi/linux/wireless.h](https://github.com/torvalds/linux/blob/master/include/uapi/linux/wireless.h)
pub const SIOCGIWNAME: libc::c_ulong = 0x8B01;

#[repr(C)]
#[derive(Clone, Copy)]
pub union ifr_ifru {
    pub ifr_addr: libc::sockaddr,
    pub ifr_hwaddr: libc::sockaddr,
    pub ifr_flags: libc::c_short,
    pub ifr_ifindex: libc::c_int,
    /// Also holds the protocol name returned by SIOCGIWNAME.
    pub ifr_newname: [libc::c_char; libc::IF_NAMESIZE],
    ifr_pad: [u8; 24],
}

#[repr(C)]
#[derive(Clone, Copy)]
/// [https://linux.die.net/man/7/netdevice](https://linux.die.net/man/7/netdevice)
pub struct c_ifreq {
    pub ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    pub ifr_ifru: ifr_ifru,
}

impl c_ifreq {
    /// Creates a zeroed request for the named interface. The name must leave
    /// room for the terminating NUL.
    pub fn with_name(ifr_name: &str) -> io::Result<c_ifreq> {
        if ifr_name.len() >= libc::IF_NAMESIZE || ifr_name.as_bytes().contains(&0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid interface name {:?}", ifr_name),
            ));
        }

        let mut ifreq = c_ifreq {
            ifr_name: [0; libc::IF_NAMESIZE],
            ifr_ifru: ifr_ifru {
                ifr_pad: [0; 24],
            },
        };

        for (i, c) in ifr_name.as_bytes().iter().enumerate() {
            ifreq.ifr_name[i] = *c as libc::c_char;
        }

        Ok(ifreq)
    }
}

/// Reads a NUL terminated string out of a fixed size C buffer.
pub fn c_str_lossy(buffer: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_name() {
        let ifreq = c_ifreq::with_name("wlan0").unwrap();
        assert_eq!("wlan0", c_str_lossy(&ifreq.ifr_name));
        assert_eq!(0, ifreq.ifr_name[5]);
    }

    #[test]
    fn test_with_name_too_long() {
        let name = "a".repeat(libc::IF_NAMESIZE);
        assert_matches!(
            c_ifreq::with_name(&name).err().map(|err| err.kind()),
            Some(io::ErrorKind::InvalidInput)
        );
        assert_matches!(c_ifreq::with_name(&name[1 ..]).map(|_| ()), Ok(()));
    }

    #[test]
    fn test_with_name_nul() {
        assert_matches!(c_ifreq::with_name("wl\0an").map(|_| ()), Err(_));
    }

    #[test]
    fn test_c_str_lossy_unterminated() {
        let buffer = [b'w' as libc::c_char, b'l' as libc::c_char];
        assert_eq!("wl", c_str_lossy(&buffer));
    }
}
