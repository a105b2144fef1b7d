//! # Control Cycle
//!
//! One pass of the node: read the probe, send the reading, listen for a
//! relay command, then let the relay controller take its step. The three
//! subsystems only exchange small values; none sees another's state.

use embedded_hal::digital::OutputPin;
use tracing::debug;

use crate::clock::MonotonicClock;
use crate::radio::transceiver::Transceiver;
use crate::radio::RadioLink;
use crate::relay::RelayController;
use crate::sensor::SensorLink;
use crate::serial::port_trait::SerialPortIO;

/// Everything one control cycle touches
pub struct Node<P, D, R, T> {
    sensor: SensorLink<P, D>,
    radio: RadioLink<T>,
    relays: RelayController<R>,
    clock: MonotonicClock,
    receive_timeout_ms: u32,
}

impl<P, D, R, T> Node<P, D, R, T>
where
    P: SerialPortIO,
    D: OutputPin,
    R: OutputPin,
    T: Transceiver,
{
    pub fn new(
        sensor: SensorLink<P, D>,
        radio: RadioLink<T>,
        relays: RelayController<R>,
        clock: MonotonicClock,
        receive_timeout_ms: u32,
    ) -> Self {
        Self {
            sensor,
            radio,
            relays,
            clock,
            receive_timeout_ms,
        }
    }

    /// Read, uplink, listen, actuate
    ///
    /// Returns whether a relay command was received. The relay controller
    /// is stepped every cycle, command or not.
    pub async fn cycle(&mut self) -> bool {
        let reading = self.sensor.sensor_read().await;

        self.radio.enter_tx();
        self.radio.send_sensor_data(&reading);

        self.radio.enter_rx();
        let command = self.radio.receive_relay_mask(self.receive_timeout_ms).await;
        if let Some(mask) = command {
            debug!("Relay command {:#04X}", mask);
            self.relays.apply_mask(mask, self.clock.now_ms());
        }

        self.relays.update(self.clock.now_ms());
        command.is_some()
    }

    pub fn sensor(&self) -> &SensorLink<P, D> {
        &self.sensor
    }

    pub fn relays(&self) -> &RelayController<R> {
        &self.relays
    }
}
