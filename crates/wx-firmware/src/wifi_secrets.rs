//! Values baked in by the build script from `.env` or the environment

use wx_core::config::InternetConfig;
use wx_core::time::DEFAULT_EPOCH_SECS;

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
const STATION_EPOCH: &str = env!("STATION_EPOCH");

pub fn internet_config() -> InternetConfig<'static> {
    InternetConfig {
        ssid: WIFI_SSID,
        password: WIFI_PASSWORD,
    }
}

/// Unix time the station clock reads at boot.
pub fn station_epoch_secs() -> u64 {
    STATION_EPOCH.parse().unwrap_or(DEFAULT_EPOCH_SECS)
}
