//! Core, platform independent frame building and interface selection code.

pub mod check;
pub mod link;
pub mod netdev;
pub mod repr;
pub mod validate;
pub mod wlan;
