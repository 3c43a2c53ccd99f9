//! Needle-insertion instrument firmware library.
//!
//! Exposes the driver, protocol and server modules for integration
//! testing and host simulation. Hardware-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; everything else
//! builds and runs on the host against the simulated bus.

#![deny(unused_must_use)]

pub mod adc;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pins;
pub mod server;
pub mod status_led;
