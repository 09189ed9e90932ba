//! Time utilities for wellspring
//!
//! Session times are absolute instants and are handled as `DateTime<Utc>`;
//! conversion to the user's local zone happens only for display.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `WELLSPRING_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for exercising join windows without waiting for a real session.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! WELLSPRING_MOCK_TIME="2025-12-25 14:30:00" wellspringd join-window 2025-12-25T14:50:00Z
//! ```

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::WellspringError;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "WELLSPRING_MOCK_TIME";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(naive_dt) => {
                        let offset = naive_dt.and_utc().signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Parse an ISO-8601 timestamp as supplied by the booking records.
///
/// RFC 3339 strings with an offset are accepted as-is. Strings without an
/// offset (`2025-03-01T10:00:00`, optionally with fractional seconds or a
/// space instead of `T`) are taken to be UTC.
pub fn parse_timestamp(s: &str) -> crate::Result<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(WellspringError::malformed(format!(
        "'{}' is not an ISO-8601 timestamp",
        s
    )))
}

/// Format a session start in the local timezone for display, with the
/// UTC offset since `Local` carries no zone name.
pub fn format_session_time(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local)
        .format("%a %d %b %Y, %H:%M %:z")
        .to_string()
}

/// Minutes left on a running countdown.
///
/// Counts whole minutes, but never reports 0 while any time remains: 61s is
/// 1 minute, 30s is also 1 minute. Zero or negative durations yield 0.
pub fn minutes_remaining(remaining: chrono::Duration) -> i64 {
    let millis = remaining.num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis / 60_000).max(1)
}

/// Largest unit shown by a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownScale {
    Hours,
    Minutes,
    Seconds,
}

impl CountdownScale {
    pub fn suffix(self) -> &'static str {
        match self {
            CountdownScale::Hours => "hours",
            CountdownScale::Minutes => "minutes",
            CountdownScale::Seconds => "seconds",
        }
    }
}

/// A countdown broken into clock fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub scale: CountdownScale,
}

impl Countdown {
    /// Split a remaining duration into fields. Sub-second remainders are
    /// truncated and negative durations count as zero.
    pub fn from_duration(remaining: chrono::Duration) -> Self {
        let total_secs = remaining.num_seconds().max(0);
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        let scale = if hours > 0 {
            CountdownScale::Hours
        } else if minutes > 0 {
            CountdownScale::Minutes
        } else {
            CountdownScale::Seconds
        };

        Self {
            hours,
            minutes,
            seconds,
            scale,
        }
    }

    /// `HH:MM:SS` without the unit suffix
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.clock(), self.scale.suffix())
    }
}
