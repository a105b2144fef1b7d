//! # Aquanode Library
//!
//! Firmware core of a remote aquaculture life-support node.
//!
//! This library provides the three subsystems the control loop sequences:
//! a Modbus-RTU master for the dissolved-oxygen/temperature probe, a
//! half-duplex radio link to the supervisory host, and a staggered,
//! watchdog-guarded relay controller.

pub mod clock;
pub mod config;
pub mod error;
pub mod gpio;
pub mod modbus;
pub mod node;
pub mod radio;
pub mod relay;
pub mod sensor;
pub mod serial;
pub mod telemetry;
