//! # Error Types
//!
//! Custom error types for Aquanode using `thiserror`.
//!
//! These cover startup and wiring failures only. Per-cycle field-bus and
//! radio failures never surface here: they are absorbed by the component
//! that observes them (see [`crate::modbus::protocol::ReadError`]).

use thiserror::Error;

/// Main error type for Aquanode
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be configured or used
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No RS-485 adapter found (tried: {0})")]
    SerialPortNotFound(String),

    /// Radio transceiver errors
    #[error("Radio error: {0}")]
    Radio(String),

    /// Digital line (GPIO) errors
    #[error("GPIO error: {0}")]
    Gpio(String),
}

/// Result type alias for Aquanode
pub type Result<T> = std::result::Result<T, NodeError>;
