//! VMC Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every VMC crate:
//! - Dynamically typed message arguments (Value)
//! - Address-tagged messages (Message)
//! - Transform math (Vec3, Quat)
//! - The error type and result alias

pub mod error;
pub mod math;
pub mod message;

pub use error::*;
pub use math::*;
pub use message::*;
