//! # Modbus Protocol Constants and Types
//!
//! Core protocol definitions for the Modbus RTU exchange with the probe.

use thiserror::Error;

/// Read Holding Registers function code
pub const MODBUS_FUNC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Registers per 32-bit float value
pub const MODBUS_FLOAT_REGISTER_COUNT: u16 = 2;

/// Request frame size: slave(1) + func(1) + addr(2) + count(2) + crc(2)
pub const MODBUS_REQUEST_FRAME_SIZE: usize = 8;

/// Minimum response size: slave(1) + func(1) + byte count(1) + data(2) + crc(2)
pub const MODBUS_MIN_RESPONSE_SIZE: usize = 7;

/// CRC trailer size
pub const MODBUS_CRC_SIZE: usize = 2;

/// Receive buffer bound for a single response
pub const MODBUS_MAX_RESPONSE_SIZE: usize = 16;

/// Payload bytes needed to form one float
pub const MODBUS_FLOAT_BYTE_COUNT: u8 = 4;

/// Offset of the byte-count field in a response
pub const MODBUS_BYTE_COUNT_OFFSET: usize = 2;

/// Offset of the first data byte in a response
pub const MODBUS_DATA_OFFSET: usize = 3;

/// Why a single register read failed
///
/// Every variant is absorbed by [`crate::sensor::SensorLink::sensor_read`];
/// the next polling cycle is the retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// No byte arrived within the response timeout
    #[error("No response within timeout")]
    Timeout,

    /// Fewer bytes than the frame needs
    ///
    /// `needed` is the 7-byte minimum until the byte-count field is known,
    /// then `3 + byte_count + 2` (header, declared data, CRC).
    #[error("Frame too short: {len} bytes, need {needed}")]
    FrameTooShort { len: usize, needed: usize },

    /// Response came from another slave
    #[error("Slave id mismatch: expected {expected}, received {received}")]
    SlaveMismatch { expected: u8, received: u8 },

    /// Response carries another function code (e.g. an exception reply)
    #[error("Function mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    FunctionMismatch { expected: u8, received: u8 },

    /// Trailer does not match the recomputed checksum
    #[error("CRC mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    CrcMismatch { expected: u16, received: u16 },

    /// Declared payload too small for a 32-bit value
    #[error("Insufficient byte count: {0}")]
    InsufficientByteCount(u8),

    /// The serial port itself failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Transport(err.to_string())
    }
}

/// An 8-byte Read Holding Registers request, CRC included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModbusRequestFrame(pub [u8; MODBUS_REQUEST_FRAME_SIZE]);

impl ModbusRequestFrame {
    /// Raw frame bytes in wire order
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Slave id the request is addressed to
    pub fn slave_id(&self) -> u8 {
        self.0[0]
    }

    /// Function code of the request
    pub fn function(&self) -> u8 {
        self.0[1]
    }
}

/// Bytes received for one request, bounded to [`MODBUS_MAX_RESPONSE_SIZE`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusResponseFrame {
    buf: [u8; MODBUS_MAX_RESPONSE_SIZE],
    len: usize,
}

impl Default for ModbusResponseFrame {
    fn default() -> Self {
        Self {
            buf: [0; MODBUS_MAX_RESPONSE_SIZE],
            len: 0,
        }
    }
}

impl ModbusResponseFrame {
    /// Received bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Spare capacity for a read into the frame
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Mark `n` more bytes of the buffer as received
    pub(crate) fn commit(&mut self, n: usize) {
        self.len = (self.len + n).min(MODBUS_MAX_RESPONSE_SIZE);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
