//! Linux implementations of the interface queries and the raw frame link.

pub mod libc;
pub mod link;
pub mod netdev;
