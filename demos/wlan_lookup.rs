#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate rawsock;

use rawsock::core::wlan::{
    discover_wireless_interfaces,
    wireless_interfaces,
    Query,
};
use rawsock::linux::netdev::Linux;

/// Lists the wireless interfaces which are up and resolves the one selected by
/// INDEX.
fn main() {
    env_logger::init();

    let matches = clap_app!(app =>
        (@arg INDEX: "Index of the interface to select, 0 by default")
    ).get_matches();

    let index = matches
        .value_of("INDEX")
        .unwrap_or("0")
        .parse::<usize>()
        .expect("Bad interface index!");

    let system = Linux::new();

    match wireless_interfaces(&system) {
        Ok(names) => {
            for (i, name) in names.iter().enumerate() {
                println!("[{}] {}", i, name);
            }
        }
        Err(err) => {
            eprintln!("Listing interfaces failed: {} ({}).", err, err.code());
            std::process::exit(1);
        }
    }

    match discover_wireless_interfaces(&system, index, Query::all()) {
        Ok(discovery) => {
            let interface = discovery.interface;
            println!(
                "Using interface: {} - index: {:#04x} - MAC: {} - number of interfaces: {}",
                interface.name,
                interface.index.unwrap_or(0),
                interface
                    .hardware_addr
                    .map(|addr| addr.to_string())
                    .unwrap_or_default(),
                discovery.count
            );
        }
        Err(err) => {
            eprintln!("Interface lookup failed: {} ({}).", err, err.code());
            std::process::exit(1);
        }
    }
}
