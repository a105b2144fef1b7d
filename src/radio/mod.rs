//! # Radio Link Module
//!
//! Half-duplex link to the supervisory host over a single packet
//! transceiver.
//!
//! This module handles:
//! - One-time transceiver bring-up with the fixed reliability profile
//! - Switching between transmit (uplink pipe) and listen (downlink pipe)
//! - Fire-and-forget telemetry uplink
//! - Bounded-wait polling for the one-byte relay command
//!
//! Retries live in the transceiver's auto-retransmit; nothing here resends.

pub mod transceiver;
pub mod udp;

use embedded_hal::digital::{Error as _, StatefulOutputPin};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::clock::{elapsed_ms, MonotonicClock};
use crate::telemetry::SensorReading;
use transceiver::{PipeAddress, RadioSettings, Transceiver};

/// Reading pipe used for the downlink
pub const DOWNLINK_PIPE: u8 = 1;

/// Status LED blink period while the transceiver does not answer
const BEGIN_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

/// Cadence of the downlink polling loop
const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Which way the single transceiver currently faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Transmit,
    Receive,
}

/// Fixed pipe pair: one to talk on, one to listen on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddresses {
    pub uplink: PipeAddress,
    pub downlink: PipeAddress,
}

/// Half-duplex transport manager
pub struct RadioLink<T> {
    radio: T,
    addresses: LinkAddresses,
    mode: RadioMode,
    clock: MonotonicClock,
}

impl<T: Transceiver> RadioLink<T> {
    /// Bring the transceiver up and apply [`RadioSettings::RELIABLE`]
    ///
    /// Blocks until the chip answers, toggling `status_led` once per second
    /// meanwhile; the LED is driven LOW once the radio is up. The link is
    /// left in transmit mode.
    pub async fn init<L: StatefulOutputPin>(
        mut radio: T,
        status_led: &mut L,
        channel: u8,
        addresses: LinkAddresses,
        clock: MonotonicClock,
    ) -> Self {
        let mut attempts: u32 = 0;
        while !radio.begin() {
            attempts += 1;
            if attempts == 1 || attempts % 10 == 0 {
                warn!("Radio not responding (attempt {}), retrying", attempts);
            }
            if let Err(e) = status_led.toggle() {
                debug!("Status LED toggle failed: {:?}", e.kind());
            }
            sleep(BEGIN_RETRY_INTERVAL).await;
        }

        if let Err(e) = status_led.set_low() {
            debug!("Status LED write failed: {:?}", e.kind());
        }

        let settings = RadioSettings::RELIABLE;
        radio.set_pa_level(settings.pa_level);
        radio.set_data_rate(settings.data_rate);
        radio.set_channel(channel);
        radio.set_crc_length(settings.crc_length);
        radio.set_auto_ack(settings.auto_ack);
        radio.set_retries(settings.retry_delay, settings.retry_count);
        radio.stop_listening();

        info!(
            "Radio up on channel {} ({:?}, {:?}, {} retries every {} µs)",
            channel,
            settings.pa_level,
            settings.data_rate,
            settings.retry_count,
            settings.retry_delay_us()
        );

        Self {
            radio,
            addresses,
            mode: RadioMode::Transmit,
            clock,
        }
    }

    /// Current mode
    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    /// Stop listening and open the uplink pipe for writing
    pub fn enter_tx(&mut self) {
        self.radio.stop_listening();
        self.radio.open_writing_pipe(self.addresses.uplink);
        self.mode = RadioMode::Transmit;
    }

    /// Open the downlink pipe and start listening
    pub fn enter_rx(&mut self) {
        self.radio.open_reading_pipe(DOWNLINK_PIPE, self.addresses.downlink);
        self.radio.start_listening();
        self.mode = RadioMode::Receive;
    }

    /// Send the reading as an 8-byte payload
    ///
    /// Acknowledgement failure is logged and otherwise ignored.
    pub fn send_sensor_data(&mut self, reading: &SensorReading) {
        if self.mode != RadioMode::Transmit {
            debug!("Uplink requested while listening, switching to TX");
            self.enter_tx();
        }

        if !self.radio.write(&reading.to_payload()) {
            debug!("Telemetry not acknowledged");
        }
    }

    /// Poll for a relay mask for up to `timeout_ms`
    ///
    /// Returns the first byte of the first payload received, or `None` once
    /// the window has fully elapsed.
    pub async fn receive_relay_mask(&mut self, timeout_ms: u32) -> Option<u8> {
        if self.mode != RadioMode::Receive {
            debug!("Downlink poll requested while transmitting, switching to RX");
            self.enter_rx();
        }

        let start = self.clock.now_ms();
        while elapsed_ms(self.clock.now_ms(), start) < timeout_ms {
            if self.radio.available() {
                let mut buf = [0u8; 1];
                if self.radio.read(&mut buf) > 0 {
                    return Some(buf[0]);
                }
            }
            sleep(RECEIVE_POLL_INTERVAL).await;
        }

        None
    }
}
