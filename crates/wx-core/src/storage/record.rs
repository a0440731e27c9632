use core::fmt::Write;

use crate::sensors::SensorReading;
use crate::time::DateTime;

/// First line of a freshly created log file.
pub const LOG_HEADER: &str =
    "Date and Time, Temperature (BME280), Humidity (BME280), Pressure (BME280), Rainfall\n";

/// Longest line a record can render to, newline included.
pub const MAX_LINE_LEN: usize = 128;

/// One serve cycle's readings as written to the weather log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime,
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub pressure: f32,
    pub rainfall_mm: f32,
}

impl LogRecord {
    pub fn new(timestamp: DateTime, reading: &SensorReading, rainfall_mm: f32) -> Self {
        Self {
            timestamp,
            temperature_celsius: reading.temperature_celsius,
            humidity_percent: reading.humidity_percent,
            pressure: reading.pressure,
            rainfall_mm,
        }
    }

    /// Renders `YYYY/MM/DD HH:MM:SS, temp, humidity, pressure, rainfall\n`.
    ///
    /// Returns `None` if the values do not fit in [`MAX_LINE_LEN`].
    pub fn to_line(&self) -> Option<heapless::String<MAX_LINE_LEN>> {
        let mut line = heapless::String::new();
        writeln!(
            line,
            "{}, {:.2}, {:.2}, {:.2}, {:.2}",
            self.timestamp,
            self.temperature_celsius,
            self.humidity_percent,
            self.pressure,
            self.rainfall_mm
        )
        .ok()?;
        Some(line)
    }
}
