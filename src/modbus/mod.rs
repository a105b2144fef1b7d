//! # Modbus-RTU Module
//!
//! Master-side implementation of the Modbus RTU subset used by the probe.
//!
//! This module handles:
//! - Read Holding Registers (0x03) request framing
//! - CRC-16/MODBUS checksum calculation
//! - Response validation (length, slave id, function, CRC, byte count)
//! - Word-swapped (CDAB) 32-bit float decoding

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
