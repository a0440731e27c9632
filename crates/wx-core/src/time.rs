//! Calendar time for log timestamps

use core::fmt;

/// 2021-01-01 00:00:00, used when the station has no better idea of the time.
pub const DEFAULT_EPOCH_SECS: u64 = 1_609_459_200;

/// Wall-clock time broken into calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Converts seconds since the Unix epoch (UTC) to calendar fields.
    pub fn from_unix_secs(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;

        // Howard Hinnant's days-to-civil, shifted so years start in March
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = doy - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 3 } else { mp - 9 };
        let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };

        Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }
}

/// `YYYY/MM/DD HH:MM:SS`
impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn unix_epoch_and_reference_dates() {
        assert_eq!(DateTime::from_unix_secs(0), DateTime::new(1970, 1, 1, 0, 0, 0));
        assert_eq!(
            DateTime::from_unix_secs(DEFAULT_EPOCH_SECS),
            DateTime::new(2021, 1, 1, 0, 0, 0)
        );
        assert_eq!(
            DateTime::from_unix_secs(1_714_564_800),
            DateTime::new(2024, 5, 1, 12, 0, 0)
        );
    }

    #[test]
    fn leap_day_and_year_end() {
        assert_eq!(
            DateTime::from_unix_secs(1_709_208_000),
            DateTime::new(2024, 2, 29, 12, 0, 0)
        );
        assert_eq!(
            DateTime::from_unix_secs(1_704_067_199),
            DateTime::new(2023, 12, 31, 23, 59, 59)
        );
    }

    #[test]
    fn displays_with_slashes_and_zero_padding() {
        let time = DateTime::new(2024, 5, 1, 9, 3, 7);
        assert_eq!(time.to_string(), "2024/05/01 09:03:07");
    }
}
