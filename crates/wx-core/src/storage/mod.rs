pub mod record;
pub mod sd_card;
pub mod weather_log;

pub use record::{LOG_HEADER, LogRecord};
pub use weather_log::{LogError, LogStore, WeatherLog};

/// CSV file holding one line per serve cycle (FAT 8.3 name)
pub const LOG_FILE: &str = "WEATHER.CSV";
