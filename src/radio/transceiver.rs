//! # Packet Radio Transceiver Capability
//!
//! The vendor transceiver driver is an external collaborator. The link layer
//! only needs the primitives below: pipe addressing, listen/transmit mode,
//! payload read/write and the reliability knobs applied once at startup.

/// Power amplifier output level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaLevel {
    Min,
    Low,
    High,
    Max,
}

/// Over-the-air data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    Kbps250,
    Mbps1,
    Mbps2,
}

/// Hardware packet CRC length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcLength {
    Disabled,
    Bits8,
    Bits16,
}

/// Reliability profile pushed into the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioSettings {
    pub pa_level: PaLevel,
    pub data_rate: DataRate,
    pub crc_length: CrcLength,
    pub auto_ack: bool,
    /// Retransmit delay code: (code + 1) × 250 µs
    pub retry_delay: u8,
    /// Retransmissions before a write is reported as failed
    pub retry_count: u8,
}

impl RadioSettings {
    /// Fixed profile: full power, 250 kbps for range, CRC-16, auto-ack,
    /// 15 retries about 4 ms apart
    pub const RELIABLE: RadioSettings = RadioSettings {
        pa_level: PaLevel::Max,
        data_rate: DataRate::Kbps250,
        crc_length: CrcLength::Bits16,
        auto_ack: true,
        retry_delay: 15,
        retry_count: 15,
    };

    /// Spacing between retransmissions in microseconds
    pub fn retry_delay_us(&self) -> u32 {
        (u32::from(self.retry_delay) + 1) * 250
    }
}

/// Radio pipe address (5 bytes)
pub type PipeAddress = [u8; 5];

/// Single half-duplex packet transceiver
#[cfg_attr(test, mockall::automock)]
pub trait Transceiver: Send {
    /// Probe and reset the chip; `false` if it does not answer
    fn begin(&mut self) -> bool;

    fn set_pa_level(&mut self, level: PaLevel);

    fn set_data_rate(&mut self, rate: DataRate);

    fn set_channel(&mut self, channel: u8);

    fn set_crc_length(&mut self, length: CrcLength);

    fn set_auto_ack(&mut self, enabled: bool);

    fn set_retries(&mut self, delay: u8, count: u8);

    /// Leave receive mode
    fn stop_listening(&mut self);

    /// Enter receive mode on the opened reading pipes
    fn start_listening(&mut self);

    fn open_writing_pipe(&mut self, address: PipeAddress);

    fn open_reading_pipe(&mut self, pipe: u8, address: PipeAddress);

    /// Whether a received payload is waiting
    fn available(&mut self) -> bool;

    /// Copy the waiting payload into `buf`, returning its length
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Transmit one payload; `true` once the peer acknowledged it
    fn write(&mut self, payload: &[u8]) -> bool;
}
