//! Timezone resolution for naive filter datetimes
//!
//! The server compares `created_at` bounds in UTC, while callers often hold
//! wall-clock times without an offset. A [`TimezoneResolver`] is configured
//! on the client and decides which zone such naive values belong to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{LathermailError, LathermailResult};

/// Attaches a zone to naive datetimes and converts them to UTC
pub trait TimezoneResolver: Send + Sync + fmt::Debug {
    /// Interpret `naive` as wall-clock time in this zone and return the UTC instant.
    ///
    /// Times inside a DST fold resolve to the earlier instant. Times inside
    /// a DST gap take the offset in effect just before the transition.
    fn to_utc(&self, naive: NaiveDateTime) -> LathermailResult<DateTime<Utc>>;
}

impl<Z> TimezoneResolver for Z
where
    Z: TimeZone + Send + Sync + fmt::Debug,
{
    fn to_utc(&self, naive: NaiveDateTime) -> LathermailResult<DateTime<Utc>> {
        match self.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                // Skipped wall-clock time, resolved with the offset an hour earlier
                match self.from_local_datetime(&(naive - Duration::hours(1))) {
                    LocalResult::Single(before) | LocalResult::Ambiguous(before, _) => {
                        Ok(before.with_timezone(&Utc) + Duration::hours(1))
                    }
                    LocalResult::None => Err(LathermailError::Timezone(format!(
                        "{} does not exist in {:?}",
                        naive, self
                    ))),
                }
            }
        }
    }
}

/// Zone selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The system's local timezone
    #[default]
    Local,
    /// An IANA zone such as `Europe/Berlin`
    Named(Tz),
    /// A fixed UTC offset such as `+03:00`
    Fixed(FixedOffset),
}

impl TimezoneResolver for Zone {
    fn to_utc(&self, naive: NaiveDateTime) -> LathermailResult<DateTime<Utc>> {
        match self {
            Zone::Local => Local.to_utc(naive),
            Zone::Named(tz) => tz.to_utc(naive),
            Zone::Fixed(offset) => offset.to_utc(naive),
        }
    }
}

impl FromStr for Zone {
    type Err = LathermailError;

    /// Accepts `local`, an IANA zone name, or an offset like `+05:30`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if s.starts_with('+') || s.starts_with('-') {
            return parse_offset(s)
                .map(Zone::Fixed)
                .ok_or_else(|| LathermailError::Timezone(format!("invalid offset '{}'", s)));
        }
        s.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|e| LathermailError::Timezone(format!("unknown timezone '{}': {}", s, e)))
    }
}

/// Parse `+HH:MM`, `-HHMM` or `+HH`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Named(tz) => f.write_str(tz.name()),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_fixed_offset_to_utc() {
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        let utc = plus_three.to_utc(naive(2024, 5, 1, 12, 0)).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_named_zone_gap_uses_offset_before_transition() {
        // 2024-03-31 02:30 is skipped in Berlin, read it at +01:00
        let zone: Zone = "Europe/Berlin".parse().unwrap();
        let utc = zone.to_utc(naive(2024, 3, 31, 2, 30)).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_named_zone_fold_takes_earliest() {
        // 2024-10-27 02:30 happens twice in Berlin, first at +02:00
        let zone: Zone = "Europe/Berlin".parse().unwrap();
        let utc = zone.to_utc(naive(2024, 10, 27, 2, 30)).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_zone() {
        assert_eq!("local".parse::<Zone>().unwrap(), Zone::Local);
        assert_eq!("LOCAL".parse::<Zone>().unwrap(), Zone::Local);
        assert_eq!(
            "+05:30".parse::<Zone>().unwrap(),
            Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap())
        );
        assert_eq!("UTC".parse::<Zone>().unwrap(), Zone::Named(Tz::UTC));
        assert_eq!(
            "-0800".parse::<Zone>().unwrap(),
            Zone::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
        );
        assert!("Not/AZone".parse::<Zone>().is_err());
        assert!("+5:3".parse::<Zone>().is_err());
        assert_eq!(Zone::Named(Tz::Europe__Berlin).to_string(), "Europe/Berlin");
    }
}
