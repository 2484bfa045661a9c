//! Refresh policy
//!
//! Decides how old an indexed resource must be before the scheduler lets it be
//! crawled again.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Minimum age before an indexed resource may be re-scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Never re-schedule anything already indexed
    #[default]
    Disabled,

    /// Re-schedule once the newest record is at least this old
    After(Duration),
}

impl RefreshPolicy {
    /// Parse a refresh delay as written on the command line
    ///
    /// Accepts `humantime` durations (`"12h"`, `"7days"`, `"1h 30m"`).
    /// Empty strings, `"none"`, `"never"`, zero durations and unparsable input
    /// all yield [`RefreshPolicy::Disabled`]; unparsable input is logged.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("never")
        {
            return Self::Disabled;
        }

        match humantime::parse_duration(raw) {
            Ok(delay) if delay.is_zero() => Self::Disabled,
            Ok(delay) => Self::After(delay),
            Err(e) => {
                tracing::warn!(
                    refresh_delay = %raw,
                    error = %e,
                    "Unparsable refresh delay, re-crawling disabled"
                );
                Self::Disabled
            }
        }
    }

    /// Resolve an optional configuration value
    pub fn from_option(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Freshness cutoff at `now`
    ///
    /// Records indexed strictly after the cutoff are fresh and block
    /// scheduling. `None` means there is no cutoff: every record, however old,
    /// blocks scheduling.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Disabled => None,
            // A delay reaching past representable time blocks every record
            Self::After(delay) => Some(
                chrono::Duration::from_std(*delay)
                    .ok()
                    .and_then(|delay| now.checked_sub_signed(delay))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::After(delay) => f.write_str(&crate::utils::format_duration(*delay)),
        }
    }
}
