use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use wx_core::config::StationConfig;

#[derive(Debug, Parser)]
#[command(about = "Serves the weather station page from simulated hardware")]
pub struct Args {
    /// Station configuration file in the same encoding as STATION.CFG
    #[arg(long, env = "WX_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "WX_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory WEATHER.CSV is written to
    #[arg(long, env = "WX_LOG_DIR", default_value = ".")]
    pub log_dir: PathBuf,

    #[arg(long, env = "WX_SERVE_INTERVAL_MS")]
    pub serve_interval_ms: Option<u32>,

    /// Time between simulated bucket tips
    #[arg(
        long,
        env = "WX_TIP_PERIOD_MS",
        default_value_t = 30_000,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub tip_period_ms: u32,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// The configuration file's settings (or the defaults) with command-line
    /// overrides applied.
    pub fn station_config(&self) -> Result<StationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let bytes =
                    fs::read(path).with_context(|| format!("failed to read config: {path:?}"))?;
                StationConfig::from_bytes(&bytes)
                    .with_context(|| format!("failed to decode config: {path:?}"))?
            }
            None => StationConfig::default(),
        };

        config.http_port = self.port;
        if let Some(serve_interval_ms) = self.serve_interval_ms {
            config.serve_interval_ms = serve_interval_ms;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_reference_config_on_simulator_port() {
        let args = Args::try_parse_from(["wx-simulator"]).unwrap();
        let config = args.station_config().unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.serve_interval_ms, 4000);
        assert_eq!(config.mm_per_pulse, 0.5);
    }

    #[test]
    fn overrides_apply_on_top_of_config_file() {
        let path = std::env::temp_dir().join(format!("wx-sim-{}-station.cfg", std::process::id()));
        let stored = StationConfig {
            mm_per_pulse: 0.2794,
            ..StationConfig::default()
        };
        fs::write(&path, stored.to_bytes().unwrap()).unwrap();

        let args = Args::try_parse_from([
            "wx-simulator",
            "--config",
            path.to_str().unwrap(),
            "--serve-interval-ms",
            "2000",
        ])
        .unwrap();
        let config = args.station_config().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.mm_per_pulse, 0.2794);
        assert_eq!(config.serve_interval_ms, 2000);
    }

    #[test]
    fn zero_tip_period_is_rejected() {
        assert!(Args::try_parse_from(["wx-simulator", "--tip-period-ms", "0"]).is_err());
    }
}
