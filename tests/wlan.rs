#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;
extern crate rand;
extern crate rawsock;

mod context;

use rawsock::core::netdev::{
    AddressFamily,
    MockSystem,
};
use rawsock::core::repr::{
    EthernetAddress,
    EthernetAddressKind,
    Ipv4Params,
    Ipv4Repr,
};
use rawsock::core::wlan::{
    discover_wireless_interfaces,
    wireless_interfaces,
    Query,
};
use rawsock::Error;

#[test]
fn lists_wireless_interfaces_which_are_up() {
    assert_eq!(
        vec!["wlan0".to_string(), "wlan1".to_string()],
        wireless_interfaces(&context::system()).unwrap()
    );
}

#[test]
fn every_listed_position_selects_its_interface() {
    let system = context::system();
    let names = wireless_interfaces(&system).unwrap();

    for (index, name) in names.iter().enumerate() {
        let discovery = discover_wireless_interfaces(&system, index, Query::name_only()).unwrap();
        assert_eq!(names.len(), discovery.count);
        assert_eq!(*name, discovery.interface.name);
    }

    assert_matches!(
        discover_wireless_interfaces(&system, names.len(), Query::name_only()),
        Err(ref err) if err.code() == -3
    );
    assert_eq!(0, system.open_controls());
}

#[test]
fn outcome_codes() {
    let mut system = context::system();
    system.interface_mut("wlan1").unwrap().up = false;
    assert_eq!(
        1,
        discover_wireless_interfaces(&system, 5, Query::all())
            .unwrap()
            .count
    );

    system.interface_mut("wlan0").unwrap().hardware_addr = None;
    assert_eq!(
        -4,
        discover_wireless_interfaces(&system, 0, Query::all())
            .unwrap_err()
            .code()
    );

    system.interface_mut("wlan0").unwrap().index = None;
    assert_eq!(
        -5,
        discover_wireless_interfaces(&system, 0, Query { hardware_addr: false, index: true })
            .unwrap_err()
            .code()
    );

    system.interface_mut("wlan0").unwrap().family = Some(AddressFamily::Inet6);
    assert_eq!(
        0,
        discover_wireless_interfaces(&system, 0, Query::all())
            .unwrap_err()
            .code()
    );

    let system = context::system().with_socket_failure();
    assert_eq!(
        -1,
        discover_wireless_interfaces(&system, 0, Query::all())
            .unwrap_err()
            .code()
    );

    let system = context::system().with_enumeration_failure();
    assert_eq!(
        -2,
        discover_wireless_interfaces(&system, 0, Query::all())
            .unwrap_err()
            .code()
    );
    assert_eq!(0, system.open_controls());
}

#[test]
fn unresolved_source_address_is_detected() {
    let mut system = context::system();
    system.interface_mut("wlan0").unwrap().hardware_addr = None;

    let mut src_addr = EthernetAddress::unresolved();
    if let Ok(discovery) = discover_wireless_interfaces(&system, 0, Query::all()) {
        src_addr = discovery.interface.hardware_addr.unwrap();
    }

    assert_eq!(EthernetAddressKind::Broadcast, src_addr.kind());
}

#[test]
fn header_population_needs_an_address() {
    let mut system = context::system();
    system.interface_mut("wlan1").unwrap().ipv4_addr = None;

    let (repr, addrs) = Ipv4Repr::populate(&system, "wlan0", "192.168.1.20", &Ipv4Params::udp()).unwrap();
    assert_eq!(MockSystem::ipv4_addr_for(1), repr.src_addr);
    assert_eq!(repr.addrs(), addrs);

    assert_matches!(
        Ipv4Repr::populate_broadcast(&system, "wlan1", &Ipv4Params::udp()),
        Err(Error::NoSourceAddress)
    );
    assert_matches!(
        Ipv4Repr::populate(&system, "wlan0", "192.168.1", &Ipv4Params::udp()),
        Err(Error::Address)
    );
    assert_eq!(0, system.open_controls());
}

#[test]
fn header_population_reports_its_own_socket_failure() {
    let system = context::system().with_socket_failure();

    let err = Ipv4Repr::populate_broadcast(&system, "wlan0", &Ipv4Params::udp()).unwrap_err();
    assert_matches!(err, Error::HeaderSocket(_));
    assert_eq!(-10, err.code());

    assert_eq!(
        -1,
        discover_wireless_interfaces(&system, 0, Query::all())
            .unwrap_err()
            .code()
    );
}
