//! # Sensor Link
//!
//! Modbus-RTU master for the dissolved-oxygen/temperature probe on the
//! shared half-duplex RS-485 bus.
//!
//! One [`SensorLink::sensor_read`] call reads the oxygen register, waits the
//! inter-request spacing, then reads the temperature register. Both values
//! are published together or not at all. Field-bus failures never escape:
//! the previous reading stays in place until the probe has been silent for
//! the stale window, after which the link reports [`SensorReading::NO_DATA`].

use embedded_hal::digital::{Error as _, OutputPin};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::clock::{elapsed_ms, MonotonicClock};
use crate::config::ModbusConfig;
use crate::modbus::decoder::decode_float_response;
use crate::modbus::encoder::encode_read_float_request;
use crate::modbus::protocol::{ModbusResponseFrame, ReadError, MODBUS_MIN_RESPONSE_SIZE};
use crate::serial::port_trait::SerialPortIO;
use crate::telemetry::SensorReading;

/// Cadence of the response wait loop
const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Modbus master bound to one probe
pub struct SensorLink<P, D> {
    port: P,
    /// RS-485 transceiver driver-enable (HIGH = transmit)
    driver_enable: D,
    config: ModbusConfig,
    clock: MonotonicClock,
    reading: SensorReading,
    last_success_ms: u32,
}

impl<P, D> SensorLink<P, D>
where
    P: SerialPortIO,
    D: OutputPin,
{
    /// Take ownership of the bus and park it in receive mode
    pub fn new(port: P, mut driver_enable: D, config: ModbusConfig, clock: MonotonicClock) -> Self {
        if let Err(e) = driver_enable.set_low() {
            warn!("Failed to release RS-485 driver-enable: {:?}", e.kind());
        }

        let last_success_ms = clock.now_ms();
        Self {
            port,
            driver_enable,
            config,
            clock,
            reading: SensorReading::NO_DATA,
            last_success_ms,
        }
    }

    /// Last published reading
    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    /// Read one 32-bit float held in two holding registers
    ///
    /// # Errors
    ///
    /// Returns the first [`ReadError`] hit while exchanging or validating
    /// the frame.
    pub async fn read_float_register(&mut self, start_address: u16) -> Result<f32, ReadError> {
        let request = encode_read_float_request(self.config.slave_id, start_address);

        self.port.discard_input()?;

        self.set_driver_enable(true)?;
        sleep(Duration::from_micros(self.config.driver_settle_us)).await;

        let sent = match self.port.write_all(request.as_bytes()).await {
            Ok(()) => self.port.flush().await,
            Err(e) => Err(e),
        };

        // Give the bus back even if the write failed
        let released = self.set_driver_enable(false);
        sent?;
        released?;

        let timeout_ms = self.config.response_timeout_ms as u32;
        let start = self.clock.now_ms();
        let mut available = self.port.bytes_available()?;

        while available < MODBUS_MIN_RESPONSE_SIZE
            && elapsed_ms(self.clock.now_ms(), start) < timeout_ms
        {
            sleep(RESPONSE_POLL_INTERVAL).await;
            available = self.port.bytes_available()?;
        }

        if available == 0 {
            return Err(ReadError::Timeout);
        }

        // Let a partially buffered frame finish arriving
        sleep(Duration::from_millis(self.config.post_arrival_settle_ms)).await;

        let mut response = ModbusResponseFrame::default();
        let n = self.port.read_available(response.spare_mut()).await?;
        response.commit(n);

        debug!(
            "Register {} response ({} bytes): {:02X?}",
            start_address,
            response.len(),
            response.as_bytes()
        );

        decode_float_response(response.as_bytes(), &request)
    }

    /// Poll both probe registers and publish the result
    ///
    /// Always returns the current public reading; see the module docs for
    /// how failures are absorbed.
    pub async fn sensor_read(&mut self) -> SensorReading {
        let oxygen = self.read_float_register(self.config.oxygen_register).await;

        sleep(Duration::from_millis(self.config.inter_request_delay_ms)).await;

        let temperature = self.read_float_register(self.config.temperature_register).await;

        let now = self.clock.now_ms();
        match (oxygen, temperature) {
            (Ok(oxygen), Ok(temperature)) => {
                self.reading = SensorReading::new(oxygen, temperature);
                self.last_success_ms = now;
                debug!("Probe: O2={:.2} mg/L, T={:.2} °C", oxygen, temperature);
            }
            (oxygen, temperature) => {
                if let Err(e) = &oxygen {
                    debug!("Oxygen read failed: {}", e);
                }
                if let Err(e) = &temperature {
                    debug!("Temperature read failed: {}", e);
                }

                let silent_for = elapsed_ms(now, self.last_success_ms);
                if silent_for >= self.config.stale_after_ms && !self.reading.is_no_data() {
                    warn!("No valid probe reading for {} ms, reporting no data", silent_for);
                    self.reading = SensorReading::NO_DATA;
                }
            }
        }

        self.reading
    }

    fn set_driver_enable(&mut self, transmit: bool) -> Result<(), ReadError> {
        let result = if transmit {
            self.driver_enable.set_high()
        } else {
            self.driver_enable.set_low()
        };

        result.map_err(|e| ReadError::Transport(format!("driver-enable line: {:?}", e.kind())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::crc::crc16_modbus;
    use crate::serial::port_trait::mocks::{BusEvent, MockSerialPort, ScriptedReply};
    use embedded_hal::digital::ErrorType;
    use std::convert::Infallible;
    use tokio::time::Instant;

    const OXYGEN_8_2: [u8; 9] = [0x01, 0x03, 0x04, 0x33, 0x33, 0x41, 0x03, 0x75, 0x29];
    const TEMPERATURE_26_1: [u8; 9] = [0x01, 0x03, 0x04, 0xCC, 0xCD, 0x41, 0xD0, 0x65, 0x50];
    const VALUE_25_5: [u8; 9] = [0x01, 0x03, 0x04, 0x00, 0x00, 0x41, 0xCC, 0xCA, 0x36];

    /// Driver-enable line that logs onto the same bus as the mock port
    struct BusLine(MockSerialPort);

    impl ErrorType for BusLine {
        type Error = Infallible;
    }

    impl OutputPin for BusLine {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.record(BusEvent::DriverEnable(false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.record(BusEvent::DriverEnable(true));
            Ok(())
        }
    }

    fn link(port: &MockSerialPort) -> SensorLink<MockSerialPort, BusLine> {
        SensorLink::new(
            port.clone(),
            BusLine(port.clone()),
            ModbusConfig::default(),
            MonotonicClock::new(),
        )
    }

    fn quick() -> Duration {
        Duration::from_millis(5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_float_register_bus_discipline() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(quick(), &VALUE_25_5));

        assert_eq!(link.read_float_register(2091).await, Ok(25.5));

        assert_eq!(
            port.events(),
            vec![
                BusEvent::DriverEnable(false), // parked in receive mode at startup
                BusEvent::Discard,
                BusEvent::DriverEnable(true),
                BusEvent::Write(vec![0x01, 0x03, 0x08, 0x2B, 0x00, 0x02, 0xB6, 0x63]),
                BusEvent::Flush,
                BusEvent::DriverEnable(false),
                BusEvent::Read(VALUE_25_5.to_vec()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_float_register_timeout() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::silence());

        let start = Instant::now();
        assert_eq!(link.read_float_register(2091).await, Err(ReadError::Timeout));

        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(800), "gave up early: {:?}", waited);
        assert!(waited < Duration::from_millis(850), "applied settle on timeout: {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_timeout_is_missed() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(Duration::from_millis(900), &VALUE_25_5));

        assert_eq!(link.read_float_register(2091).await, Err(ReadError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_collects_slow_tail() {
        let port = MockSerialPort::new();
        let mut link = link(&port);

        // Head shows up just before the timeout, tail lands inside the settle window
        port.queue_reply(
            ScriptedReply::at(Duration::from_millis(790), &VALUE_25_5[..3])
                .then(Duration::from_millis(820), &VALUE_25_5[3..]),
        );

        assert_eq!(link.read_float_register(2091).await, Ok(25.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_truncated_reply_is_too_short() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(quick(), &VALUE_25_5[..5]));

        assert_eq!(
            link.read_float_register(2091).await,
            Err(ReadError::FrameTooShort { len: 5, needed: 7 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupted_reply_is_crc_mismatch() {
        let port = MockSerialPort::new();
        let mut link = link(&port);

        let mut corrupted = VALUE_25_5;
        corrupted[4] ^= 0x10;
        port.queue_reply(ScriptedReply::at(quick(), &corrupted));

        assert!(matches!(
            link.read_float_register(2091).await,
            Err(ReadError::CrcMismatch { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_bytes_are_discarded() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.inject_stale(&[0xDE, 0xAD, 0xBE, 0xEF]);
        port.queue_reply(ScriptedReply::at(quick(), &VALUE_25_5));

        assert_eq!(link.read_float_register(2091).await, Ok(25.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exception_reply_is_function_mismatch() {
        let port = MockSerialPort::new();
        let mut link = link(&port);

        let mut reply = vec![0x01, 0x83, 0x02, 0x00, 0x00];
        let crc = crc16_modbus(&reply);
        reply.extend_from_slice(&crc.to_le_bytes());
        port.queue_reply(ScriptedReply::at(quick(), &reply));

        assert_eq!(
            link.read_float_register(2091).await,
            Err(ReadError::FunctionMismatch { expected: 0x03, received: 0x83 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_releases_bus() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.set_write_error(std::io::ErrorKind::BrokenPipe);

        assert!(matches!(
            link.read_float_register(2091).await,
            Err(ReadError::Transport(_))
        ));
        assert_eq!(port.events().last(), Some(&BusEvent::DriverEnable(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_read_publishes_both_values() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(quick(), &OXYGEN_8_2));
        port.queue_reply(ScriptedReply::at(quick(), &TEMPERATURE_26_1));

        let reading = link.sensor_read().await;
        assert_eq!(reading, SensorReading::new(8.2, 26.1));
        assert_eq!(link.reading(), reading);

        let written = port.get_written_data();
        assert_eq!(written.len(), 2);
        assert_eq!(&written[0][2..4], &[0x08, 0x2B]);
        assert_eq!(&written[1][2..4], &[0x09, 0x6B]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_read_spacing_between_registers() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(quick(), &OXYGEN_8_2));
        port.queue_reply(ScriptedReply::at(quick(), &TEMPERATURE_26_1));

        let start = Instant::now();
        link.sensor_read().await;

        // Two exchanges (5 ms reply + 50 ms settle each) plus 250 ms spacing
        assert!(start.elapsed() >= Duration::from_millis(250 + 2 * 55));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_read_partial_failure_keeps_previous() {
        let port = MockSerialPort::new();
        let mut link = link(&port);
        port.queue_reply(ScriptedReply::at(quick(), &OXYGEN_8_2));
        port.queue_reply(ScriptedReply::at(quick(), &TEMPERATURE_26_1));
        let first = link.sensor_read().await;

        // Oxygen answers with a new value, temperature stays silent
        port.queue_reply(ScriptedReply::at(quick(), &VALUE_25_5));
        port.queue_reply(ScriptedReply::silence());

        assert_eq!(link.sensor_read().await, first, "pair must never be split");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fallback_after_five_minutes() {
        let port = MockSerialPort::new();
        let clock = MonotonicClock::new();
        let mut link = SensorLink::new(
            port.clone(),
            BusLine(port.clone()),
            ModbusConfig::default(),
            clock,
        );

        port.queue_reply(ScriptedReply::at(quick(), &OXYGEN_8_2));
        port.queue_reply(ScriptedReply::at(quick(), &TEMPERATURE_26_1));
        let good = link.sensor_read().await;
        let success_at = clock.now_ms();

        // Probe disconnected: nothing ever answers again
        let mut went_stale = false;
        while elapsed_ms(clock.now_ms(), success_at) < 310_000 {
            let reading = link.sensor_read().await;
            let silent_for = elapsed_ms(clock.now_ms(), success_at);

            if silent_for < 300_000 {
                assert_eq!(reading, good, "changed after only {} ms", silent_for);
            } else {
                assert!(reading.is_no_data(), "still stale data after {} ms", silent_for);
                went_stale = true;
            }
        }
        assert!(went_stale);

        // No spontaneous recovery
        for _ in 0..3 {
            assert!(link.sensor_read().await.is_no_data());
        }

        // A good read restores real values
        port.queue_reply(ScriptedReply::at(quick(), &OXYGEN_8_2));
        port.queue_reply(ScriptedReply::at(quick(), &TEMPERATURE_26_1));
        assert_eq!(link.sensor_read().await, good);
    }
}
