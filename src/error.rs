//! Registry and device handle error types

use blink1_transport::TransportError;
use thiserror::Error;

/// Errors from registry bookkeeping and device operations
#[derive(Error, Debug)]
pub enum Blink1Error {
    /// Transport layer error (open, send, permissions)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An add notification arrived for an id that is already registered
    #[error("Device already registered: {0}")]
    DuplicateDevice(String),

    /// An update or remove notification named an id that is not registered
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A notification source is already attached to the registry
    #[error("Registry is already watching a device source")]
    AlreadyWatching,

    /// An I/O step did not finish in time
    #[error("Operation timed out: {operation}")]
    Timeout { operation: &'static str },

    /// The handle was closed by its owner
    #[error("Device handle is closed")]
    Closed,

    /// The device was unplugged
    #[error("Device detached: {0}")]
    Detached(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
