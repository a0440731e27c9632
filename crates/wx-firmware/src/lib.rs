//! ESP32-S3 firmware-specific modules for wx-station
//!
//! This crate holds the code that only builds for the device: peripheral
//! bring-up, the Wi-Fi and TCP adapters behind the core's network traits,
//! the uptime clock and the credentials baked in at build time.

#![no_std]

extern crate alloc;

pub mod clock;
pub mod hardware;
pub mod net;
pub mod wifi_secrets;
