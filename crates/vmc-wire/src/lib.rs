//! VMC Wire Protocol - OSC 1.0 packets
//!
//! Byte-level OSC decoding and encoding is done by `rosc`. This crate maps
//! OSC packets to and from VMC `Message`s:
//! - Bundles flatten depth-first, in wire order
//! - Argument types `i f s b h d T F N I` map to `Value`; other OSC types
//!   are rejected
//! - Bundle nesting is bounded

pub mod packet;

pub use packet::*;
