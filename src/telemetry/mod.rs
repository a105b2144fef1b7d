//! # Telemetry Module
//!
//! The probe reading relayed to the supervisory host.
//!
//! Uplink payload: 8 raw bytes, two little-endian IEEE-754 floats,
//! oxygen then temperature.

/// Uplink payload size in bytes
pub const TELEMETRY_PAYLOAD_SIZE: usize = 8;

/// Last known good probe values
///
/// `{0.0, 0.0}` means "no valid data": either nothing has been read yet or
/// the probe has been silent for too long.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Dissolved oxygen in mg/L
    pub oxygen: f32,

    /// Water temperature in °C
    pub temperature: f32,
}

impl SensorReading {
    /// Reading that signals "no valid data" downstream
    pub const NO_DATA: SensorReading = SensorReading {
        oxygen: 0.0,
        temperature: 0.0,
    };

    pub fn new(oxygen: f32, temperature: f32) -> Self {
        Self { oxygen, temperature }
    }

    /// Encode as the 8-byte uplink payload
    pub fn to_payload(&self) -> [u8; TELEMETRY_PAYLOAD_SIZE] {
        let mut payload = [0u8; TELEMETRY_PAYLOAD_SIZE];
        payload[..4].copy_from_slice(&self.oxygen.to_le_bytes());
        payload[4..].copy_from_slice(&self.temperature.to_le_bytes());
        payload
    }

    /// Decode an uplink payload, as the host does
    ///
    /// Returns `None` unless exactly 8 bytes are given.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() != TELEMETRY_PAYLOAD_SIZE {
            return None;
        }

        let oxygen = f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let temperature = f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        Some(Self { oxygen, temperature })
    }

    /// Whether this is the "no valid data" marker
    pub fn is_no_data(&self) -> bool {
        *self == Self::NO_DATA
    }
}
