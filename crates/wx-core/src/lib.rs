//! Hardware-independent core library for wx-station
//!
//! This crate contains all platform-agnostic logic for the rain gauge weather
//! station: the shared pulse accumulator and the edge counter that feeds it,
//! rainfall aggregation, analog sensor conversion, the CSV weather log, page
//! rendering and the sequential HTTP serving loop.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod app_state;
pub mod config;
pub mod http;
pub mod network;
pub mod rain;
pub mod sensors;
pub mod server;
pub mod storage;
pub mod time;
