//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Configuration is read once at startup. Every value has a default matching
//! the field hardware, so a missing file or section yields a working node.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{NodeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub modbus: ModbusConfig,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
}

/// RS-485 serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Modbus master configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ModbusConfig {
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    #[serde(default = "default_oxygen_register")]
    pub oxygen_register: u16,

    #[serde(default = "default_temperature_register")]
    pub temperature_register: u16,

    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    #[serde(default = "default_driver_settle_us")]
    pub driver_settle_us: u64,

    /// Extra wait after the first response bytes show up
    #[serde(default = "default_post_arrival_settle_ms")]
    pub post_arrival_settle_ms: u64,

    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,

    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u32,
}

/// Radio link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_radio_channel")]
    pub channel: u8,

    /// Address this node transmits on
    #[serde(default = "default_uplink_address")]
    pub uplink_address: String,

    /// Address this node listens on
    #[serde(default = "default_downlink_address")]
    pub downlink_address: String,

    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Local socket of the UDP bench transceiver
    #[serde(default = "default_radio_bind")]
    pub bind: String,

    /// Host socket of the UDP bench transceiver
    #[serde(default = "default_radio_peer")]
    pub peer: String,
}

/// Relay controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_relay_interval_ms")]
    pub interval_ms: u32,

    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u32,
}

/// Raspberry Pi pin assignment (BCM numbering)
#[derive(Debug, Deserialize, Clone)]
pub struct GpioConfig {
    #[serde(default = "default_driver_enable_pin")]
    pub driver_enable: u8,

    #[serde(default = "default_relay_pins")]
    pub relays: [u8; 4],

    #[serde(default = "default_status_led_pin")]
    pub status_led: u8,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 19200 }

fn default_slave_id() -> u8 { 1 }
fn default_oxygen_register() -> u16 { 2091 }
fn default_temperature_register() -> u16 { 2411 }
fn default_response_timeout_ms() -> u64 { 800 }
fn default_driver_settle_us() -> u64 { 100 }
fn default_post_arrival_settle_ms() -> u64 { 50 }
fn default_inter_request_delay_ms() -> u64 { 250 }
fn default_stale_after_ms() -> u32 { 300_000 }

fn default_radio_channel() -> u8 { 100 }
fn default_uplink_address() -> String { "RPi58".to_string() }
fn default_downlink_address() -> String { "Bp32A".to_string() }
fn default_receive_timeout_ms() -> u64 { 500 }
fn default_radio_bind() -> String { "0.0.0.0:5801".to_string() }
fn default_radio_peer() -> String { "127.0.0.1:5800".to_string() }

fn default_relay_interval_ms() -> u32 { 5000 }
fn default_watchdog_timeout_ms() -> u32 { 300_000 }

fn default_driver_enable_pin() -> u8 { 8 }
fn default_relay_pins() -> [u8; 4] { [3, 4, 5, 6] }
fn default_status_led_pin() -> u8 { 13 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            slave_id: default_slave_id(),
            oxygen_register: default_oxygen_register(),
            temperature_register: default_temperature_register(),
            response_timeout_ms: default_response_timeout_ms(),
            driver_settle_us: default_driver_settle_us(),
            post_arrival_settle_ms: default_post_arrival_settle_ms(),
            inter_request_delay_ms: default_inter_request_delay_ms(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel: default_radio_channel(),
            uplink_address: default_uplink_address(),
            downlink_address: default_downlink_address(),
            receive_timeout_ms: default_receive_timeout_ms(),
            bind: default_radio_bind(),
            peer: default_radio_peer(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_relay_interval_ms(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            driver_enable: default_driver_enable_pin(),
            relays: default_relay_pins(),
            status_led: default_status_led_pin(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> NodeError {
    NodeError::Config(toml::de::Error::custom(msg))
}

impl RadioConfig {
    /// Uplink pipe address as raw bytes
    pub fn uplink_bytes(&self) -> [u8; 5] {
        address_bytes(&self.uplink_address)
    }

    /// Downlink pipe address as raw bytes
    pub fn downlink_bytes(&self) -> [u8; 5] {
        address_bytes(&self.downlink_address)
    }
}

/// Pipe addresses are validated to be 5 ASCII bytes
fn address_bytes(address: &str) -> [u8; 5] {
    let mut out = [0u8; 5];
    for (dst, src) in out.iter_mut().zip(address.bytes()) {
        *dst = src;
    }
    out
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use aquanode::config::Config;
    ///
    /// let config = Config::load("config/aquanode.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file if it exists, otherwise fall back to built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 19200, 38400, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 115200"));
        }

        // Modbus
        if self.modbus.slave_id == 0 || self.modbus.slave_id > 247 {
            return Err(invalid("slave_id must be between 1 and 247"));
        }

        if self.modbus.oxygen_register == self.modbus.temperature_register {
            return Err(invalid("oxygen_register and temperature_register must differ"));
        }

        if self.modbus.response_timeout_ms == 0 || self.modbus.response_timeout_ms > 10000 {
            return Err(invalid("response_timeout_ms must be between 1 and 10000"));
        }

        if self.modbus.driver_settle_us > 10000 {
            return Err(invalid("driver_settle_us must be at most 10000"));
        }

        if self.modbus.post_arrival_settle_ms > 1000 {
            return Err(invalid("post_arrival_settle_ms must be at most 1000"));
        }

        if self.modbus.inter_request_delay_ms > 10000 {
            return Err(invalid("inter_request_delay_ms must be at most 10000"));
        }

        if self.modbus.stale_after_ms == 0 {
            return Err(invalid("stale_after_ms must be greater than 0"));
        }

        // Radio
        if self.radio.channel > 125 {
            return Err(invalid("radio channel must be between 0 and 125"));
        }

        for (name, address) in [
            ("uplink_address", &self.radio.uplink_address),
            ("downlink_address", &self.radio.downlink_address),
        ] {
            if address.len() != 5 || !address.is_ascii() {
                return Err(invalid(format!("{} must be exactly 5 ASCII characters", name)));
            }
        }

        if self.radio.uplink_address == self.radio.downlink_address {
            return Err(invalid("uplink_address and downlink_address must differ"));
        }

        if self.radio.receive_timeout_ms == 0 || self.radio.receive_timeout_ms > 10000 {
            return Err(invalid("receive_timeout_ms must be between 1 and 10000"));
        }

        // Relay
        if self.relay.interval_ms == 0 || self.relay.interval_ms > 60000 {
            return Err(invalid("relay interval_ms must be between 1 and 60000"));
        }

        if self.relay.watchdog_timeout_ms <= self.relay.interval_ms {
            return Err(invalid("watchdog_timeout_ms must be greater than interval_ms"));
        }

        // GPIO (BCM 0-27 on the 40-pin header)
        let mut pins = vec![self.gpio.driver_enable, self.gpio.status_led];
        pins.extend_from_slice(&self.gpio.relays);
        for &pin in &pins {
            if pin > 27 {
                return Err(invalid(format!("GPIO pin {} is out of bounds (must be 0-27)", pin)));
            }
        }

        let mut sorted = pins.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != pins.len() {
            return Err(invalid("GPIO pins must not be assigned twice"));
        }

        Ok(())
    }
}
