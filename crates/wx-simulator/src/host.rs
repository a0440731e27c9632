//! Host implementations of the station's I/O seams
//!
//! Everything here blocks the calling thread. The serving loop runs on a
//! single `block_on`, so a blocking accept is the same as an awaited one.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{Datelike, Local, Timelike};
use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};
use wx_core::server::{Connection, Listener};
use wx_core::storage::LogStore;
use wx_core::time::{Clock, DateTime};

/// Idle time after which a stalled client is dropped.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HostListener {
    inner: std::net::TcpListener,
}

impl HostListener {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            inner: std::net::TcpListener::bind(addr)?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Listener for HostListener {
    type Error = io::Error;
    type Connection<'a>
        = HostConnection
    where
        Self: 'a;

    async fn accept(&mut self) -> io::Result<HostConnection> {
        let (stream, peer) = self.inner.accept()?;
        stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
        debug!("Client connected from {}", peer);

        Ok(HostConnection { stream })
    }
}

pub struct HostConnection {
    stream: TcpStream,
}

impl Connection for HostConnection {
    type Error = io::Error;

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    async fn close(&mut self) {
        let _ = self.stream.flush();
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("Socket shutdown: {}", e);
        }
    }
}

/// Log files kept as plain files in one directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Uses `dir`, creating it if needed.
    pub fn new(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl LogStore for FileStore {
    type Error = io::Error;

    fn create_new(&mut self, name: &str, contents: &[u8]) -> io::Result<bool> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(name))
        {
            Ok(mut file) => {
                file.write_all(contents)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn append(&mut self, name: &str, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.path(name))?;
        file.write_all(contents)
    }
}

/// The host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime {
        let now = Local::now();
        let year = u16::try_from(now.year()).unwrap_or_else(|_| {
            warn!("Local year {} out of range", now.year());
            0
        });
        DateTime::new(
            year,
            now.month() as u8,
            now.day() as u8,
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        )
    }
}

/// Delay that parks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    async fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
