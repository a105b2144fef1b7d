//! # Aquanode
//!
//! Remote life-support controller node: polls the dissolved-oxygen probe
//! over Modbus RTU, relays readings to the supervisory host over the packet
//! radio, and drives the four relay loads from the host's command byte.

use anyhow::{Context, Result};
use embedded_hal::digital::{OutputPin, StatefulOutputPin};
use tracing::info;

use aquanode::clock::MonotonicClock;
use aquanode::config::Config;
use aquanode::node::Node;
use aquanode::radio::udp::UdpTransceiver;
use aquanode::radio::{LinkAddresses, RadioLink};
use aquanode::relay::{RelayController, RELAY_CHANNELS};
use aquanode::sensor::SensorLink;
use aquanode::serial::port_trait::SerialPortIO;
use aquanode::serial::ProbeSerial;

/// Used when no config path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/aquanode.toml";

/// Number of control cycles between status log messages
const LOG_INTERVAL_CYCLES: u64 = 20;

/// Main entry point for the node
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first CLI argument, or the default path)
///    - Claim output lines, open the probe's serial port and the radio
///
/// 2. **Main Loop**
///    - Read the probe, send the reading, wait for a relay command
///    - Advance the relay controller
///    - Log status every 20 cycles
///
/// 3. **Shutdown** on Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid or a device cannot be
/// opened at startup. Nothing after startup is fatal.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Aquanode v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    config.validate()?;

    let serial = ProbeSerial::open(&config.serial.port, config.serial.baud_rate)?;
    info!("Probe serial port opened at: {}", serial.device_path());
    let port = serial.into_port();

    let radio = UdpTransceiver::bind(&config.radio.bind, &config.radio.peer)?;

    #[cfg(feature = "gpio")]
    {
        use aquanode::gpio::header_output;

        let pins = &config.gpio;
        let driver_enable = header_output(pins.driver_enable, false)?;
        let status_led = header_output(pins.status_led, false)?;
        let relays = [
            header_output(pins.relays[0], true)?,
            header_output(pins.relays[1], true)?,
            header_output(pins.relays[2], true)?,
            header_output(pins.relays[3], true)?,
        ];
        run(config, port, driver_enable, relays, status_led, radio).await
    }

    #[cfg(not(feature = "gpio"))]
    {
        use aquanode::gpio::LoggedLine;

        info!("Built without `gpio`: relay and LED lines are log-only");
        let driver_enable = LoggedLine::quiet("rs485_de", false);
        let status_led = LoggedLine::new("status_led", false);
        let relays = [
            LoggedLine::new("relay0", true),
            LoggedLine::new("relay1", true),
            LoggedLine::new("relay2", true),
            LoggedLine::new("relay3", true),
        ];
        run(config, port, driver_enable, relays, status_led, radio).await
    }
}

/// Bring the link up and run the control loop until Ctrl+C
async fn run<P, D, R, L>(
    config: Config,
    port: P,
    driver_enable: D,
    relay_pins: [R; RELAY_CHANNELS],
    mut status_led: L,
    transceiver: UdpTransceiver,
) -> Result<()>
where
    P: SerialPortIO,
    D: OutputPin,
    R: OutputPin,
    L: StatefulOutputPin,
{
    let clock = MonotonicClock::new();

    let addresses = LinkAddresses {
        uplink: config.radio.uplink_bytes(),
        downlink: config.radio.downlink_bytes(),
    };
    let radio = RadioLink::init(transceiver, &mut status_led, config.radio.channel, addresses, clock).await;

    let relays = RelayController::init(relay_pins, &config.relay, clock.now_ms());
    let sensor = SensorLink::new(port, driver_enable, config.modbus.clone(), clock);

    let receive_timeout_ms = u32::try_from(config.radio.receive_timeout_ms).unwrap_or(u32::MAX);
    let mut node = Node::new(sensor, radio, relays, clock, receive_timeout_ms);

    info!("Starting control loop");
    info!("Press Ctrl+C to exit");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut cycle_count: u64 = 0;
    let mut commands_received: u64 = 0;

    loop {
        tokio::select! {
            received = node.cycle() => {
                cycle_count += 1;
                if received {
                    commands_received += 1;
                }

                if cycle_count % LOG_INTERVAL_CYCLES == 0 {
                    let reading = node.sensor().reading();
                    info!(
                        "Cycle {}: O2 {:.2} mg/L, {:.2} °C, relays {:#04X}{}, {} commands received",
                        cycle_count,
                        reading.oxygen,
                        reading.temperature,
                        node.relays().applied_mask().bits() & 0x0F,
                        if node.relays().timeout_active() { " (watchdog)" } else { "" },
                        commands_received
                    );
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total cycles: {}", cycle_count);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_CYCLES, 20);
    }

    #[test]
    fn test_default_config_path_loads() {
        // The shipped sample must parse and validate
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.radio.uplink_bytes(), *b"RPi58");
        assert_eq!(config.radio.downlink_bytes(), *b"Bp32A");
    }
}
