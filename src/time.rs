//! High-precision time values and the SEED BTIME header field.
//!
//! Record start and end times are carried as [`HpTime`]: signed integer
//! microseconds since 1970-01-01T00:00:00. All gap and tolerance arithmetic
//! in the assembler is done in these units, so that two records are compared
//! without floating point drift.

use std::fmt;

/// Microseconds since the Unix epoch.
pub type HpTime = i64;

/// Number of [`HpTime`] ticks per second.
pub const HPTMODULUS: i64 = 1_000_000;

const SECONDS_PER_DAY: i64 = 86_400;

/// Days from 0001-01-01 to 1970-01-01 in the proleptic Gregorian calendar.
const DAYS_BEFORE_EPOCH: i64 = 719_162;

/// BTIME timestamp (10 bytes in the miniSEED v2 fixed header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTime {
    pub year: u16,
    pub day: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub fract: u16, // 0.0001 second units
}

impl BTime {
    /// 1970-001 00:00:00.0000
    pub fn epoch() -> Self {
        Self {
            year: 1970,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fract: 0,
        }
    }

    /// Convert to high-precision time.
    pub fn to_hptime(&self) -> HpTime {
        let days = days_before_year(self.year as i64) + (self.day as i64 - 1);
        let seconds = ((days * 24 + self.hour as i64) * 60 + self.minute as i64) * 60
            + self.second as i64;
        seconds * HPTMODULUS + self.fract as i64 * (HPTMODULUS / 10_000)
    }

    /// Convert from high-precision time, truncating to 0.0001 s.
    pub fn from_hptime(time: HpTime) -> Self {
        let days = time.div_euclid(SECONDS_PER_DAY * HPTMODULUS);
        let within_day = time.rem_euclid(SECONDS_PER_DAY * HPTMODULUS);

        let mut year = 1970 + days.div_euclid(365);
        while days_before_year(year) > days {
            year -= 1;
        }
        while days_before_year(year + 1) <= days {
            year += 1;
        }

        let seconds = within_day / HPTMODULUS;
        Self {
            year: year as u16,
            day: (days - days_before_year(year) + 1) as u16,
            hour: (seconds / 3600) as u8,
            minute: (seconds / 60 % 60) as u8,
            second: (seconds % 60) as u8,
            fract: (within_day % HPTMODULUS / 100) as u16,
        }
    }
}

impl Default for BTime {
    fn default() -> Self {
        Self::epoch()
    }
}

impl From<BTime> for HpTime {
    fn from(bt: BTime) -> Self {
        bt.to_hptime()
    }
}

impl fmt::Display for BTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:03} {:02}:{:02}:{:02}.{:04}",
            self.year, self.day, self.hour, self.minute, self.second, self.fract
        )
    }
}

/// Render a high-precision time as `YYYY-DDD HH:MM:SS.ffffff`.
pub fn format_hptime(time: HpTime) -> String {
    let bt = BTime::from_hptime(time);
    format!(
        "{:04}-{:03} {:02}:{:02}:{:02}.{:06}",
        bt.year,
        bt.day,
        bt.hour,
        bt.minute,
        bt.second,
        time.rem_euclid(HPTMODULUS)
    )
}

/// Days between 1970-01-01 and January 1st of `year`.
fn days_before_year(year: i64) -> i64 {
    let y = year - 1;
    y * 365 + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400) - DAYS_BEFORE_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(BTime::epoch().to_hptime(), 0);
        assert_eq!(BTime::from_hptime(0), BTime::epoch());
    }

    #[test]
    fn test_known_timestamp() {
        // 2024-015 10:30:45.1234 == 2024-01-15T10:30:45.1234Z == 1705314645.1234
        let bt = BTime {
            year: 2024,
            day: 15,
            hour: 10,
            minute: 30,
            second: 45,
            fract: 1234,
        };
        assert_eq!(bt.to_hptime(), 1_705_314_645_123_400);
        assert_eq!(BTime::from_hptime(bt.to_hptime()), bt);
    }

    #[test]
    fn test_leap_year_end() {
        let bt = BTime {
            year: 2016,
            day: 366,
            hour: 23,
            minute: 59,
            second: 59,
            fract: 9999,
        };
        let t = bt.to_hptime();
        assert_eq!(BTime::from_hptime(t), bt);
        let next = BTime::from_hptime(t + 100);
        assert_eq!((next.year, next.day, next.hour), (2017, 1, 0));
    }

    #[test]
    fn test_before_epoch() {
        let bt = BTime {
            year: 1969,
            day: 365,
            hour: 23,
            minute: 59,
            second: 59,
            fract: 0,
        };
        assert_eq!(bt.to_hptime(), -HPTMODULUS);
        assert_eq!(BTime::from_hptime(-HPTMODULUS), bt);
    }

    #[test]
    fn test_format_hptime() {
        let t = 1_705_314_645_123_456;
        assert_eq!(format_hptime(t), "2024-015 10:30:45.123456");
    }
}
