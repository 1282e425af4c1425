//! Error types for the VMC receiver stack

use thiserror::Error;

/// Core VMC errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmcError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Unsupported type tag: {0:?}")]
    UnsupportedTypeTag(char),

    // Protocol errors
    #[error("Bad message: missing address")]
    BadMessage,

    #[error("Protocol violation: {0} is not valid")]
    ProtocolViolation(String),

    // Chain errors
    #[error("Next receiver does not implement the daisy chain")]
    NotAReceiver,

    #[error("Too many calls in chain (depth {0}), maybe infinite loop")]
    ChainTooDeep(u32),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Transport errors
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Result type for VMC operations
pub type VmcResult<T> = Result<T, VmcError>;
