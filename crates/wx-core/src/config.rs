//! Station configuration
//!
//! The defaults reproduce the reference station: 0.5 mm per gauge tip, a
//! 10 ms gauge poll, a 4 s serve cycle and a 3.3 V / 10-bit ADC. A
//! `postcard`-encoded copy can live on the SD card to override them.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::sensors::{AnalogChannels, AnalogConversion, MCP3008_CHANNELS};

/// Name of the optional configuration file on the SD card.
pub const CONFIG_FILE: &str = "STATION.CFG";

/// Credentials for the network the station joins.
#[derive(Debug, Default, Clone, Copy)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StationConfig {
    /// Rainfall depth represented by one bucket tip
    pub mm_per_pulse: f32,
    pub rain_poll_interval_ms: u32,
    /// Pause after each served page; also the page's refresh period
    pub serve_interval_ms: u32,
    pub http_port: u16,
    pub join_attempts: u8,
    pub join_retry_interval_ms: u32,
    pub vref: f32,
    pub adc_resolution_bits: u8,
    pub temperature_offset: f32,
    pub temperature_scale: f32,
    pub temperature_channel: u8,
    pub humidity_channel: u8,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            mm_per_pulse: 0.5,
            rain_poll_interval_ms: 10,
            serve_interval_ms: 4000,
            http_port: 80,
            join_attempts: 10,
            join_retry_interval_ms: 1000,
            vref: 3.3,
            adc_resolution_bits: 10,
            temperature_offset: 0.5,
            temperature_scale: 100.0,
            temperature_channel: 1,
            humidity_channel: 0,
        }
    }
}

impl StationConfig {
    /// Page auto-refresh period in whole seconds, never below one.
    pub fn refresh_secs(&self) -> u32 {
        (self.serve_interval_ms / 1000).max(1)
    }

    pub fn analog(&self) -> AnalogConversion {
        AnalogConversion {
            vref: self.vref,
            resolution_bits: self.adc_resolution_bits,
            temperature_offset: self.temperature_offset,
            temperature_scale: self.temperature_scale,
        }
    }

    pub fn analog_channels(&self) -> AnalogChannels {
        AnalogChannels {
            temperature: self.temperature_channel,
            humidity: self.humidity_channel,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Decodes a stored configuration, rejecting values the station cannot run with.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        let config: Self = postcard::from_bytes(bytes)?;
        if config.is_usable() {
            Ok(config)
        } else {
            Err(postcard::Error::SerdeDeCustom)
        }
    }

    fn is_usable(&self) -> bool {
        self.mm_per_pulse.is_finite()
            && self.mm_per_pulse > 0.0
            && self.rain_poll_interval_ms > 0
            && self.join_attempts > 0
            && (1..=16).contains(&self.adc_resolution_bits)
            && self.vref.is_finite()
            && self.vref > 0.0
            && self.temperature_channel < MCP3008_CHANNELS
            && self.humidity_channel < MCP3008_CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_station() {
        let config = StationConfig::default();
        assert_eq!(config.mm_per_pulse, 0.5);
        assert_eq!(config.rain_poll_interval_ms, 10);
        assert_eq!(config.serve_interval_ms, 4000);
        assert_eq!(config.refresh_secs(), 4);
        assert_eq!(config.http_port, 80);
        assert_eq!(config.join_attempts, 10);
    }

    #[test]
    fn stored_config_overrides_defaults() {
        let stored = StationConfig {
            mm_per_pulse: 0.2794,
            serve_interval_ms: 10_000,
            ..StationConfig::default()
        };

        let bytes = stored.to_bytes().unwrap();
        let loaded = StationConfig::from_bytes(&bytes).unwrap();

        assert_eq!(loaded, stored);
        assert_eq!(loaded.refresh_secs(), 10);
    }

    #[test]
    fn unusable_config_is_rejected() {
        let broken = StationConfig {
            mm_per_pulse: 0.0,
            ..StationConfig::default()
        };
        let bytes = broken.to_bytes().unwrap();
        assert!(StationConfig::from_bytes(&bytes).is_err());
        assert!(StationConfig::from_bytes(&[0xff]).is_err());
    }

    #[test]
    fn channels_beyond_the_adc_are_rejected() {
        let temperature = StationConfig {
            temperature_channel: 9,
            ..StationConfig::default()
        };
        let humidity = StationConfig {
            humidity_channel: MCP3008_CHANNELS,
            ..StationConfig::default()
        };
        let last_channel = StationConfig {
            humidity_channel: MCP3008_CHANNELS - 1,
            ..StationConfig::default()
        };

        assert!(StationConfig::from_bytes(&temperature.to_bytes().unwrap()).is_err());
        assert!(StationConfig::from_bytes(&humidity.to_bytes().unwrap()).is_err());
        assert_eq!(
            StationConfig::from_bytes(&last_channel.to_bytes().unwrap()).unwrap(),
            last_channel
        );
    }
}
