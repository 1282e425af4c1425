//! VMC Receiver
//!
//! Receives Virtual Motion Capture messages and drives an avatar with them.
//!
//! # Pipeline
//!
//! Message → Decoder → Command → Applier → Targets → next receiver
//!
//! - The decoder classifies a message against a fixed address table
//! - The applier writes root, bone, blendshape and camera updates through
//!   target traits, with optional low-pass filtering
//! - Peripheral input (controller, keyboard, MIDI) goes to listeners
//! - Receivers can be daisy-chained; forwarding depth is bounded

pub mod apply;
pub mod avatar;
pub mod bone;
pub mod chain;
pub mod command;
pub mod config;
pub mod decoder;
pub mod filter;
pub mod target;

pub use apply::*;
pub use avatar::*;
pub use bone::*;
pub use chain::*;
pub use command::*;
pub use config::*;
pub use decoder::*;
pub use filter::*;
pub use target::*;
