//! Sequential HTTP serving loop
//!
//! Each serve cycle walks the same path:
//!
//! ```text
//! WAIT_CONNECTION -> ACCEPT -> SAMPLE -> AGGREGATE_RAIN -> LOG -> RENDER -> RESPOND -> CLOSE
//! ```
//!
//! One connection is handled at a time. A failure anywhere between accept and
//! respond closes the connection and the loop goes back to waiting; a failed
//! log write is reported but the page is still sent. Sensors are sampled before
//! the rain gauge is drained, so a cycle that dies on a sensor error leaves its
//! pulses for the next one.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::config::StationConfig;
use crate::http::{REQUEST_BUFFER_SIZE, RESPONSE_HEAD, header_end, render_page};
use crate::rain::RainfallAggregator;
use crate::sensors::{Sensor, SensorError, SensorReading};
use crate::storage::{LogRecord, LogStore, WeatherLog};
use crate::time::Clock;

/// Pause after a failed accept so a persistent socket fault cannot starve
/// the gauge task.
const ACCEPT_RETRY_MS: u32 = 100;

/// An accepted client connection.
pub trait Connection {
    type Error: Debug;

    /// Reads into `buf`, returning 0 once the peer has finished sending.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Flushes what can be flushed and releases the connection.
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Something that hands out one client connection at a time.
pub trait Listener {
    type Error: Debug;
    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Blocks until a client connects.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection<'_>, Self::Error>>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeError {
    #[error("failed to accept connection")]
    Accept,
    #[error("failed to read request")]
    Request,
    #[error("sensor read failed: {0}")]
    Sensor(SensorError),
    #[error("failed to write response")]
    Respond,
}

/// Everything a serve cycle touches apart from the listener.
pub struct Station<'a, S, St, C, M: RawMutex> {
    sensors: S,
    rain: RainfallAggregator<'a, M>,
    log: WeatherLog<St>,
    clock: C,
    refresh_secs: u32,
}

impl<'a, S, St, C, M> Station<'a, S, St, C, M>
where
    S: Sensor<Readings = SensorReading>,
    St: LogStore,
    C: Clock,
    M: RawMutex,
{
    pub fn new(
        sensors: S,
        rain: RainfallAggregator<'a, M>,
        log: WeatherLog<St>,
        clock: C,
        refresh_secs: u32,
    ) -> Self {
        Self {
            sensors,
            rain,
            log,
            clock,
            refresh_secs,
        }
    }

    pub fn rainfall_mm(&self) -> f32 {
        self.rain.total_mm()
    }

    #[cfg(test)]
    pub(crate) fn log(&self) -> &WeatherLog<St> {
        &self.log
    }

    /// Serves one accepted connection, stopping at the first failing stage.
    async fn respond<Conn: Connection>(&mut self, conn: &mut Conn) -> Result<(), ServeError> {
        discard_request(conn).await?;

        let reading = self.sensors.read().await.map_err(|e| {
            error!("Sensor read failed: {}", e);
            ServeError::Sensor(e)
        })?;
        let rainfall_mm = self.rain.tick();

        let record = LogRecord::new(self.clock.now(), &reading, rainfall_mm);
        if let Err(e) = self.log.append(&record) {
            warn!("Error writing to CSV file: {}", e);
        }

        let page = render_page(&reading, rainfall_mm, self.refresh_secs);
        conn.write_all(RESPONSE_HEAD.as_bytes())
            .await
            .map_err(|e| {
                error!("Failed to write response head: {:?}", e);
                ServeError::Respond
            })?;
        conn.write_all(page.as_bytes()).await.map_err(|e| {
            error!("Failed to write page: {:?}", e);
            ServeError::Respond
        })?;

        Ok(())
    }
}

/// Reads the request until the header block ends, the buffer fills, or the
/// peer stops sending. The contents are never looked at.
async fn discard_request<Conn: Connection>(conn: &mut Conn) -> Result<usize, ServeError> {
    let mut buf = [0u8; REQUEST_BUFFER_SIZE];
    let mut filled = 0;

    while filled < buf.len() {
        let n = conn.read(&mut buf[filled..]).await.map_err(|e| {
            error!("Failed to read request: {:?}", e);
            ServeError::Request
        })?;
        if n == 0 {
            break;
        }
        filled += n;
        if header_end(&buf[..filled]).is_some() {
            break;
        }
    }

    debug!("Discarded {} request bytes", filled);
    Ok(filled)
}

/// The request/response/logging loop.
pub struct ServingLoop<'a, L, S, St, C, M: RawMutex> {
    listener: L,
    station: Station<'a, S, St, C, M>,
    serve_interval_ms: u32,
}

impl<'a, L, S, St, C, M> ServingLoop<'a, L, S, St, C, M>
where
    L: Listener,
    S: Sensor<Readings = SensorReading>,
    St: LogStore,
    C: Clock,
    M: RawMutex,
{
    pub fn new(listener: L, station: Station<'a, S, St, C, M>, config: &StationConfig) -> Self {
        Self {
            listener,
            station,
            serve_interval_ms: config.serve_interval_ms,
        }
    }

    #[cfg(test)]
    pub(crate) fn station(&self) -> &Station<'a, S, St, C, M> {
        &self.station
    }

    /// Runs one serve cycle: accept, respond, close.
    ///
    /// The connection is closed whether or not the response made it out.
    pub async fn serve_once(&mut self) -> Result<(), ServeError> {
        let mut conn = self.listener.accept().await.map_err(|e| {
            warn!("Accept failed: {:?}", e);
            ServeError::Accept
        })?;

        let result = self.station.respond(&mut conn).await;
        conn.close().await;
        result
    }

    /// Serves pages forever.
    ///
    /// Sleeps `serve_interval_ms` after every page that went out. Failed cycles
    /// are logged and the loop goes straight back to waiting for a connection.
    pub async fn run<D: DelayNs>(&mut self, delay: &mut D) -> ! {
        if let Err(e) = self.station.log.ensure_header() {
            warn!("Weather log unavailable at startup: {}", e);
        }

        loop {
            let result = self.serve_once().await;
            match &result {
                Ok(()) => info!("Served page, rainfall {:.2} mm", self.station.rainfall_mm()),
                Err(ServeError::Accept) => {}
                Err(e) => warn!("Connection closed due to error: {}", e),
            }
            if let Some(ms) = pause_after(&result, self.serve_interval_ms) {
                delay.delay_ms(ms).await;
            }
        }
    }
}

/// How long to wait before the next accept, given how a cycle ended.
fn pause_after(result: &Result<(), ServeError>, serve_interval_ms: u32) -> Option<u32> {
    match result {
        Ok(()) => Some(serve_interval_ms),
        Err(ServeError::Accept) => Some(ACCEPT_RETRY_MS),
        Err(_) => None,
    }
}
