//! VMC Transport Layer
//!
//! UDP source of OSC packets. Packets are decoded and bundles flattened
//! off the receiver's thread; decoded messages arrive over a channel in
//! wire order.

pub mod udp;

pub use udp::*;
