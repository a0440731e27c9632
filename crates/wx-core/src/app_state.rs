//! Application-wide run state and error types for wx-station

use core::fmt::Write;

use log::info;
use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    Serving,
    Error,
}

impl RunState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::WifiConnecting => "wifi connecting",
            Self::WifiConnected => "wifi connected",
            Self::Serving => "serving",
            Self::Error => "error",
        }
    }
}

/// Tracks the station's run state, logging every transition.
pub struct StationState {
    run_state: RunState,
}

impl Default for StationState {
    fn default() -> Self {
        Self::new()
    }
}

impl StationState {
    pub const fn new() -> Self {
        Self {
            run_state: RunState::Uninitialized,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn transition(&mut self, next: RunState) {
        if self.run_state != next {
            info!("Station state: {} -> {}", self.run_state.label(), next.label());
            self.run_state = next;
        }
    }
}

/// Errors that end the station's run. The firmware resets on any of these.
#[derive(Error, Debug)]
pub enum StationError {
    #[error("WiFi connection failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Network stack error: {0}")]
    Network(heapless::String<64>),
    #[error("SD card error: {0}")]
    Storage(heapless::String<64>),
    #[error("Sensor error: {0}")]
    Sensor(heapless::String<64>),
    #[error("Unknown error")]
    Unknown,
}

/// Writer that keeps as much of the output as fits.
struct Truncating<'a, const N: usize>(&'a mut heapless::String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            self.0.push(c).map_err(|_| core::fmt::Error)?;
        }
        Ok(())
    }
}

/// Formats `args` into a fixed-capacity message, truncating on overflow.
pub fn short_message(args: core::fmt::Arguments<'_>) -> heapless::String<64> {
    let mut message = heapless::String::new();
    // A full buffer is a truncated message, not a failure.
    let _ = Truncating(&mut message).write_fmt(args);
    message
}
