//! # Relay Controller
//!
//! Failsafe actuator for the four relay-driven loads.
//!
//! Commands never touch the outputs directly. [`RelayController::update`]
//! walks the channels one at a time, one step per interval, and writes a
//! channel only when its commanded level differs from what was last
//! written. If no command arrives within the watchdog window every output is
//! rolled back to HIGH (the safe state with normally-closed wiring) through
//! the same staggered walk.

pub mod mask;

use embedded_hal::digital::{Error as _, OutputPin};
use tracing::{debug, info, warn};

use crate::clock::elapsed_ms;
use crate::config::RelayConfig;
pub use mask::{RelayMask, RELAY_CHANNELS};

/// Staggered, watchdog-guarded relay driver
pub struct RelayController<P> {
    pins: [P; RELAY_CHANNELS],
    interval_ms: u32,
    watchdog_timeout_ms: u32,

    /// Last commanded mask (or the forced safe mask)
    current_mask: RelayMask,
    /// Levels actually written to the pins
    applied_mask: RelayMask,
    /// Channel eligible at the next tick, always `< RELAY_CHANNELS`
    channel_cursor: usize,
    last_interval_tick: u32,
    /// Time of the last received command; the watchdog never touches it
    last_mask_update: u32,
    timeout_active: bool,
}

impl<P: OutputPin> RelayController<P> {
    /// Drive every output HIGH and start both timers at `now`
    pub fn init(pins: [P; RELAY_CHANNELS], config: &RelayConfig, now: u32) -> Self {
        let mut controller = Self {
            pins,
            interval_ms: config.interval_ms,
            watchdog_timeout_ms: config.watchdog_timeout_ms,
            current_mask: RelayMask::SAFE,
            applied_mask: RelayMask::SAFE,
            channel_cursor: 0,
            last_interval_tick: now,
            last_mask_update: now,
            timeout_active: false,
        };

        for channel in 0..RELAY_CHANNELS {
            if !controller.write_channel(channel, true) {
                // Unknown level: make the first walk rewrite it
                controller.applied_mask = controller.applied_mask.with_channel(channel, false);
            }
        }

        info!(
            "Relays initialized HIGH (interval {} ms, watchdog {} ms)",
            controller.interval_ms, controller.watchdog_timeout_ms
        );
        controller
    }

    /// Accept a freshly received command
    ///
    /// Outputs follow on the next interval ticks.
    pub fn apply_mask(&mut self, mask: u8, now: u32) {
        let mask = RelayMask::new(mask);
        if mask != self.current_mask {
            debug!("Relay mask {:#04X} -> {:#04X}", self.current_mask.bits(), mask.bits());
        }

        self.current_mask = mask;
        self.last_mask_update = now;
        self.timeout_active = false;
    }

    /// Run the watchdog, then at most one staggered channel step
    pub fn update(&mut self, now: u32) {
        if !self.timeout_active && elapsed_ms(now, self.last_mask_update) >= self.watchdog_timeout_ms {
            warn!(
                "No relay command for {} ms, returning all outputs to safe state",
                elapsed_ms(now, self.last_mask_update)
            );
            self.current_mask = RelayMask::SAFE;
            self.channel_cursor = 0;
            self.timeout_active = true;
            self.last_interval_tick = now;
        }

        if elapsed_ms(now, self.last_interval_tick) < self.interval_ms {
            return;
        }

        let channel = self.channel_cursor;
        let desired = self.current_mask.channel(channel);
        if desired != self.applied_mask.channel(channel) && self.write_channel(channel, desired) {
            self.applied_mask = self.applied_mask.with_channel(channel, desired);
        }

        self.channel_cursor += 1;
        if self.channel_cursor >= RELAY_CHANNELS {
            self.channel_cursor = 0;
            if self.timeout_active {
                debug!("Safe-state rollout complete");
                self.timeout_active = false;
            }
        }

        self.last_interval_tick = now;
    }

    /// Last commanded mask
    pub fn current_mask(&self) -> RelayMask {
        self.current_mask
    }

    /// Levels last written to hardware
    pub fn applied_mask(&self) -> RelayMask {
        self.applied_mask
    }

    pub fn channel_cursor(&self) -> usize {
        self.channel_cursor
    }

    /// Whether a forced safe-state walk is in progress
    pub fn timeout_active(&self) -> bool {
        self.timeout_active
    }

    fn write_channel(&mut self, channel: usize, high: bool) -> bool {
        let result = if high {
            self.pins[channel].set_high()
        } else {
            self.pins[channel].set_low()
        };

        match result {
            Ok(()) => {
                info!("Relay {} -> {}", channel, if high { "HIGH" } else { "LOW" });
                true
            }
            Err(e) => {
                warn!("Relay {} write failed: {:?}", channel, e.kind());
                false
            }
        }
    }
}
