use core::fmt::Debug;

use log::{debug, error, info};
use thiserror_no_std::Error;

use super::record::{LOG_HEADER, LogRecord};

/// Append-only file storage the weather log is written through.
pub trait LogStore {
    type Error: Debug;

    /// Creates `name` holding `contents`.
    ///
    /// Returns `Ok(false)` without touching the file if it already exists.
    fn create_new(&mut self, name: &str, contents: &[u8]) -> Result<bool, Self::Error>;

    /// Appends `contents` to `name`, creating the file if needed.
    fn append(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Error>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error("log storage failed to {operation}")]
    Store { operation: &'static str },
    #[error("log record does not fit in a line")]
    RecordTooLong,
}

/// CSV weather log: a header line followed by one line per serve cycle.
pub struct WeatherLog<S> {
    store: S,
    file_name: &'static str,
    header_checked: bool,
}

impl<S: LogStore> WeatherLog<S> {
    pub fn new(store: S, file_name: &'static str) -> Self {
        Self {
            store,
            file_name,
            header_checked: false,
        }
    }

    /// Creates the log with its header line unless it already exists.
    ///
    /// Returns whether the file was created by this call.
    pub fn ensure_header(&mut self) -> Result<bool, LogError> {
        let created = self
            .store
            .create_new(self.file_name, LOG_HEADER.as_bytes())
            .map_err(|e| {
                error!("Failed to create {}: {:?}", self.file_name, e);
                LogError::Store {
                    operation: "create log file",
                }
            })?;

        if created {
            info!("Created {} with header", self.file_name);
        }
        self.header_checked = true;
        Ok(created)
    }

    /// Appends one record, writing the header first if it has not been checked yet.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), LogError> {
        if !self.header_checked {
            self.ensure_header()?;
        }

        let line = record.to_line().ok_or(LogError::RecordTooLong)?;
        self.store
            .append(self.file_name, line.as_bytes())
            .map_err(|e| {
                error!("Failed to append to {}: {:?}", self.file_name, e);
                LogError::Store {
                    operation: "append record",
                }
            })?;

        debug!("Logged data: {}", line.trim_end());
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
