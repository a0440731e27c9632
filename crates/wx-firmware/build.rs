//! Bakes Wi-Fi credentials and the clock epoch into the firmware.
//!
//! Values come from the process environment or, failing that, a `.env` file
//! in this crate or any parent directory.

const DEFAULT_STATION_EPOCH: &str = "1609459200";

fn main() {
    // The environment takes precedence over .env; a missing file is fine.
    let _ = dotenvy::dotenv();

    for (key, default) in [
        ("WIFI_SSID", ""),
        ("WIFI_PASSWORD", ""),
        ("STATION_EPOCH", DEFAULT_STATION_EPOCH),
    ] {
        let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
        if value.is_empty() {
            println!("cargo:warning={key} is not set; the station will not be able to join");
        }
        println!("cargo:rustc-env={key}={value}");
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
