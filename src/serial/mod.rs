//! # Serial Communication Module
//!
//! Handles the RS-485 field bus to the dissolved-oxygen probe.
//!
//! This module handles:
//! - Opening the RS-485 adapter at 19,200 baud, 8N2
//! - Falling back across candidate device paths
//! - Exposing the port through [`port_trait::SerialPortIO`]

pub mod port_trait;

use crate::error::{NodeError, Result};
use port_trait::TokioSerialPort;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Probe baud rate (19,200 baud)
pub const PROBE_BAUD_RATE: u32 = 19_200;

/// Default RS-485 adapter paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-RS485 dongles
    "/dev/ttyAMA0", // On-board UART with external transceiver
];

/// RS-485 port to the probe
pub struct ProbeSerial {
    /// Serial port handle
    port: TokioSerialPort,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for ProbeSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ProbeSerial {
    /// Open the configured device, then the default paths
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::SerialPortNotFound`] if no path could be opened
    pub fn open(preferred: &str, baud_rate: u32) -> Result<Self> {
        let mut paths = vec![preferred];
        paths.extend(DEFAULT_DEVICE_PATHS.iter().filter(|p| **p != preferred));
        Self::open_with_paths(&paths, baud_rate)
    }

    /// Open the first path that accepts the probe's line settings
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened RS-485 adapter at {} ({} baud, 8N2)", path, baud_rate);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(NodeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with the probe's settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::Two)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| NodeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Hand the port over to its owner
    pub fn into_port(self) -> TokioSerialPort {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PROBE_BAUD_RATE, 19_200);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let err = ProbeSerial::open_with_paths(invalid_paths, PROBE_BAUD_RATE).unwrap_err();

        match err {
            NodeError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            _ => panic!("Expected SerialPortNotFound error, got: {:?}", err),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match ProbeSerial::open_with_paths(empty_paths, PROBE_BAUD_RATE).unwrap_err() {
            NodeError::SerialPortNotFound(_) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_port_with_invalid_path_returns_error() {
        let result = ProbeSerial::open_port("/dev/nonexistent_serial_device_12345", PROBE_BAUD_RATE);

        match result.unwrap_err() {
            NodeError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        match ProbeSerial::open(DEFAULT_DEVICE_PATHS[0], PROBE_BAUD_RATE) {
            Ok(serial) => println!("Opened RS-485 adapter at: {}", serial.device_path()),
            Err(_) => println!("No RS-485 hardware detected (this is OK for CI/CD)"),
        }
    }
}
