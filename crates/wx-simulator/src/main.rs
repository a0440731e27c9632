//! Desktop simulator for the wx-station weather server.
//!
//! Runs the same serving loop as the firmware, with synthetic probes, a
//! simulated tipping-bucket gauge on its own thread, a host TCP listener and
//! the weather log written to a local directory.
//!
//! ```text
//! RUST_LOG=debug cargo run -p wx-simulator -- --port 8080 --tip-period-ms 5000
//! ```

mod args;
mod host;
mod mock;

use std::fs;

use anyhow::Context as _;
use args::Args;
use clap::Parser as _;
use embassy_futures::block_on;
use log::info;
use wx_core::rain::{PulseAccumulator, RainfallAggregator, SharedPulses};
use wx_core::sensors::StationSensors;
use wx_core::server::{ServingLoop, Station};
use wx_core::storage::{LOG_FILE, WeatherLog};

use crate::host::{FileStore, HostListener, LocalClock, ThreadDelay};
use crate::mock::{SimulatedAdc, SimulatedBarometer, spawn_gauge};

/// Pulses counted by the gauge thread and drained by the serving loop.
static RAIN_PULSES: SharedPulses = PulseAccumulator::new();

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.station_config()?;

    if let Some(path) = &args.write_config {
        let bytes = config.to_bytes().context("failed to encode config")?;
        fs::write(path, bytes).with_context(|| format!("failed to write config: {path:?}"))?;
        info!("Wrote configuration to {:?}", path);
        return Ok(());
    }

    spawn_gauge(&RAIN_PULSES, config.rain_poll_interval_ms, args.tip_period_ms)
        .context("failed to start simulated gauge")?;

    let store = FileStore::new(&args.log_dir)
        .with_context(|| format!("failed to open log directory: {:?}", args.log_dir))?;
    info!("Logging to {:?}", store.path(LOG_FILE));

    let sensors = StationSensors::new(
        SimulatedAdc::new(config.analog(), config.analog_channels()),
        SimulatedBarometer::new(),
        config.analog(),
        config.analog_channels(),
    );
    let station = Station::new(
        sensors,
        RainfallAggregator::new(&RAIN_PULSES, config.mm_per_pulse),
        WeatherLog::new(store, LOG_FILE),
        LocalClock,
        config.refresh_secs(),
    );

    let listener = HostListener::bind(("0.0.0.0", config.http_port))
        .with_context(|| format!("failed to listen on port {}", config.http_port))?;
    info!("Serving on http://{}", listener.local_addr()?);

    let mut serving = ServingLoop::new(listener, station, &config);
    block_on(serving.run(&mut ThreadDelay))
}
