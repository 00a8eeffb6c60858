//! Discovery of wireless interfaces which are up and selection of the one to
//! bind to.

use std::collections::VecDeque;

use crate::core::netdev::{
    AddressFamily,
    Control,
    IfEntry,
    System,
};
use crate::core::repr::EthernetAddress;
use crate::{
    Error,
    Result,
};

/// Optional facts to query about the selected interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub hardware_addr: bool,
    pub index: bool,
}

impl Query {
    /// Resolve only the interface name.
    pub fn name_only() -> Query {
        Query::default()
    }

    /// Resolve the interface name, hardware address and OS index.
    pub fn all() -> Query {
        Query {
            hardware_addr: true,
            index: true,
        }
    }
}

/// A resolved interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    /// Present only if queried.
    pub hardware_addr: Option<EthernetAddress>,
    /// Present only if queried.
    pub index: Option<u32>,
}

/// Outcome of a successful discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    /// Number of wireless interfaces found up.
    pub count: usize,
    pub interface: InterfaceDescriptor,
}

/// Finds the wireless interfaces which are up and resolves the index-th one.
///
/// Interfaces are numbered in discovery order, starting at 0. If exactly one
/// interface is found the index is ignored. Every handle acquired is released
/// before returning, whatever the outcome.
pub fn discover_wireless_interfaces<S: System>(
    system: &S,
    index: usize,
    query: Query,
) -> Result<Discovery> {
    let control = system.open_control().map_err(Error::Socket)?;
    let entries = system.interfaces().map_err(Error::Enumeration)?;
    let candidates = wireless_candidates(&control, &entries);

    let count = candidates.len();
    let selected = match count {
        0 => {
            debug!("No wireless interfaces found.");
            return Err(Error::NoInterface);
        }
        1 => candidates[0],
        _ if index >= count => {
            debug!("Index {} is out of range for {} interfaces.", index, count);
            return Err(Error::Index);
        }
        // The head holds the last interface discovered, so index 0 is
        // count - 1 steps away from it.
        _ => candidates[count - 1 - index],
    };

    let mut interface = InterfaceDescriptor {
        name: selected.name.clone(),
        hardware_addr: None,
        index: None,
    };

    if query.hardware_addr {
        interface.hardware_addr = Some(
            control
                .hardware_addr(&interface.name)
                .map_err(Error::HardwareAddress)?,
        );
    }

    if query.index {
        interface.index = Some(
            control
                .index(&interface.name)
                .map_err(Error::InterfaceIndex)?,
        );
    }

    debug!("Selected {:?} out of {} interfaces.", interface, count);

    Ok(Discovery { count, interface })
}

/// Returns the names of the wireless interfaces which are up, ordered so the
/// position of each name is the index that selects it.
pub fn wireless_interfaces<S: System>(system: &S) -> Result<Vec<String>> {
    let control = system.open_control().map_err(Error::Socket)?;
    let entries = system.interfaces().map_err(Error::Enumeration)?;

    Ok(wireless_candidates(&control, &entries)
        .iter()
        .rev()
        .map(|entry| entry.name.clone())
        .collect())
}

/// Filters packet family records down to wireless interfaces which are up.
/// Matches are pushed onto the front, so the last one discovered is first.
fn wireless_candidates<'a, C: Control>(control: &C, entries: &'a [IfEntry]) -> VecDeque<&'a IfEntry> {
    let mut candidates = VecDeque::new();

    for entry in entries {
        if entry.family != Some(AddressFamily::Packet) {
            continue;
        }

        match control.wireless_protocol(&entry.name) {
            Ok(protocol) => trace!("{} is wireless ({}).", entry.name, protocol),
            Err(err) => {
                trace!("Ignoring {}, not wireless: {}.", entry.name, err);
                continue;
            }
        }

        match control.is_up(&entry.name) {
            Ok(true) => candidates.push_front(entry),
            Ok(false) => debug!("Ignoring {}, interface is down.", entry.name),
            Err(err) => debug!("Ignoring {}, flags unavailable: {}.", entry.name, err),
        }
    }

    candidates
}
