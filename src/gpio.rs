//! # Digital Line Adapters
//!
//! The core only needs "set/get a named digital line", expressed through
//! `embedded-hal` 1.0 [`OutputPin`] / [`StatefulOutputPin`]. This module
//! provides the concrete lines the binary wires in:
//!
//! - Raspberry Pi header pins via `rppal` (feature `gpio`)
//! - [`LoggedLine`], a pin that only records and logs its level, for bench
//!   runs and for RS-485 adapters with automatic direction control

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use std::convert::Infallible;
use tracing::{debug, info};

/// Digital line with no hardware behind it
#[derive(Debug, Clone)]
pub struct LoggedLine {
    name: String,
    high: bool,
    /// Log level changes at INFO rather than DEBUG
    loud: bool,
}

impl LoggedLine {
    /// A line that logs every level change at INFO (relays, status LED)
    pub fn new(name: impl Into<String>, initial_high: bool) -> Self {
        Self {
            name: name.into(),
            high: initial_high,
            loud: true,
        }
    }

    /// A line whose changes are only worth a DEBUG line (driver-enable)
    pub fn quiet(name: impl Into<String>, initial_high: bool) -> Self {
        Self {
            loud: false,
            ..Self::new(name, initial_high)
        }
    }

    fn set(&mut self, high: bool) {
        if self.high != high {
            let level = if high { "HIGH" } else { "LOW" };
            if self.loud {
                info!("{} -> {}", self.name, level);
            } else {
                debug!("{} -> {}", self.name, level);
            }
        }
        self.high = high;
    }
}

impl ErrorType for LoggedLine {
    type Error = Infallible;
}

impl OutputPin for LoggedLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

impl StatefulOutputPin for LoggedLine {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Claim a Raspberry Pi header pin (BCM numbering) as an output
///
/// # Errors
///
/// Returns [`crate::error::NodeError::Gpio`] if the GPIO peripheral or the
/// pin is unavailable
#[cfg(feature = "gpio")]
pub fn header_output(bcm_pin: u8, initial_high: bool) -> crate::error::Result<rppal::gpio::OutputPin> {
    use crate::error::NodeError;

    let gpio = rppal::gpio::Gpio::new().map_err(|e| NodeError::Gpio(e.to_string()))?;
    let pin = gpio
        .get(bcm_pin)
        .map_err(|e| NodeError::Gpio(format!("BCM {}: {}", bcm_pin, e)))?;

    Ok(if initial_high {
        pin.into_output_high()
    } else {
        pin.into_output_low()
    })
}
