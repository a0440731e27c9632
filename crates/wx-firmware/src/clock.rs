use embassy_time::Instant;
use embedded_sdmmc::{TimeSource, Timestamp};
use wx_core::time::{Clock, DateTime};

/// Wall-clock time as a fixed epoch plus time since boot.
///
/// The station has no RTC or time sync, so every boot starts counting from
/// the same epoch again.
#[derive(Debug, Clone, Copy)]
pub struct UptimeClock {
    epoch_secs: u64,
}

impl UptimeClock {
    pub const fn new(epoch_secs: u64) -> Self {
        Self { epoch_secs }
    }
}

impl Clock for UptimeClock {
    fn now(&self) -> DateTime {
        DateTime::from_unix_secs(self.epoch_secs + Instant::now().as_secs())
    }
}

impl TimeSource for UptimeClock {
    fn get_timestamp(&self) -> Timestamp {
        let now = self.now();
        Timestamp::from_calendar(now.year, now.month, now.day, now.hour, now.minute, now.second)
            .unwrap_or(Timestamp {
                year_since_1970: 0,
                zero_indexed_month: 0,
                zero_indexed_day: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
            })
    }
}
