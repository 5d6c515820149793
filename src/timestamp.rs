//! Conversion of stored message timestamps to calendar strings.
//!
//! Messages stores send times as an offset from 2001-01-01 00:00:00 UTC,
//! either in seconds or, in newer databases, in nanoseconds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SearchIndexError};

/// Seconds between the Unix epoch and 2001-01-01 00:00:00 UTC
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Output format of normalized timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Stored values above this magnitude are nanoseconds; as seconds they would
// be ~30,000 years away from the epoch.
const NANOSECOND_THRESHOLD: u64 = 1_000_000_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Timezone timestamps are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    /// Coordinated Universal Time
    #[default]
    Utc,
    /// Timezone of the machine running the indexer
    Local,
    /// Fixed offset from UTC, e.g. `+09:00`
    Fixed(FixedOffset),
    /// IANA timezone, e.g. `Europe/Berlin`
    Named(Tz),
}

impl FromStr for TimeZoneSetting {
    type Err = SearchIndexError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(Self::Utc);
        }
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if s.starts_with(['+', '-']) {
            return parse_offset(s).map(Self::Fixed);
        }

        s.parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| SearchIndexError::InvalidTimeZone(format!("{s}: {e}")))
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("UTC"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

// Accepts `+HH:MM`, `+HHMM` and `+HH`.
fn parse_offset(s: &str) -> Result<FixedOffset> {
    let bad = || SearchIndexError::InvalidTimeZone(s.to_string());

    let (sign, rest) = s.split_at(1);
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
        return Err(bad());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| bad())?;
    let minutes: i32 = if digits.len() == 4 { digits[2..].parse().map_err(|_| bad())? } else { 0 };
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }

    let seconds = (hours * 3600 + minutes * 60) * if sign == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(bad)
}

/// Convert a raw stored timestamp to a UTC instant
pub fn to_datetime(raw: i64) -> Result<DateTime<Utc>> {
    let (seconds, nanos) = if raw.unsigned_abs() > NANOSECOND_THRESHOLD {
        (raw.div_euclid(NANOS_PER_SECOND), raw.rem_euclid(NANOS_PER_SECOND))
    } else {
        (raw, 0)
    };

    let unix = seconds
        .checked_add(APPLE_EPOCH_OFFSET)
        .ok_or(SearchIndexError::InvalidTimestamp(raw))?;

    // rem_euclid keeps nanos in 0..1e9, which always fits u32
    let nanos = u32::try_from(nanos).map_err(|_| SearchIndexError::InvalidTimestamp(raw))?;
    DateTime::<Utc>::from_timestamp(unix, nanos).ok_or(SearchIndexError::InvalidTimestamp(raw))
}

/// Render a raw stored timestamp as `YYYY-MM-DD HH:MM:SS` in `tz`
pub fn normalize(raw: i64, tz: TimeZoneSetting) -> Result<String> {
    let instant = to_datetime(raw)?;
    let rendered = match tz {
        TimeZoneSetting::Utc => instant.format(TIMESTAMP_FORMAT).to_string(),
        TimeZoneSetting::Local => instant.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
        TimeZoneSetting::Fixed(offset) => instant.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
        TimeZoneSetting::Named(zone) => instant.with_timezone(&zone).format(TIMESTAMP_FORMAT).to_string(),
    };
    Ok(rendered)
}
