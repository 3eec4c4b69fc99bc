// SPDX-License-Identifier: MIT

//! Human-readable duration parsing, used for workflow `sleep` durations,
//! queue poll intervals, and DO eviction timeouts.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("empty duration string")]
    Empty,
    #[error("invalid number in duration: {0}")]
    InvalidNumber(String),
    #[error("unknown duration suffix: {0}")]
    UnknownSuffix(String),
}

/// Parses strings like `"500ms"`, `"30s"`, `"5m"`, `"2h"`, `"1d"`.
/// A bare number (no suffix) is treated as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ParseDurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], s[i..].trim()))
        .unwrap_or((s, ""));

    let num: u64 =
        num_str.parse().map_err(|_| ParseDurationError::InvalidNumber(s.to_string()))?;

    match suffix {
        "ms" | "millis" | "millisecond" | "milliseconds" => Ok(Duration::from_millis(num)),
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(num)),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(Duration::from_secs(num * 60)),
        "h" | "hr" | "hrs" | "hour" | "hours" => Ok(Duration::from_secs(num * 3600)),
        "d" | "day" | "days" => Ok(Duration::from_secs(num * 86400)),
        other => Err(ParseDurationError::UnknownSuffix(other.to_string())),
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    if secs % 86400 == 0 {
        return format!("{}d", secs / 86400);
    }
    if secs % 3600 == 0 {
        return format!("{}h", secs / 3600);
    }
    if secs % 60 == 0 {
        return format!("{}m", secs / 60);
    }
    format!("{}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        ms = { "500ms", Duration::from_millis(500) },
        bare = { "30", Duration::from_secs(30) },
        secs = { "45s", Duration::from_secs(45) },
        mins = { "5m", Duration::from_secs(300) },
        hours = { "2h", Duration::from_secs(7200) },
        days = { "1d", Duration::from_secs(86400) },
    )]
    fn parses_valid_durations(input: &str, expected: Duration) {
        assert_eq!(parse_duration(input).unwrap(), expected);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(parse_duration(""), Err(ParseDurationError::Empty));
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(matches!(parse_duration("5fortnights"), Err(ParseDurationError::UnknownSuffix(_))));
    }

    #[test]
    fn round_trips_through_format() {
        for d in [Duration::from_secs(90), Duration::from_secs(3600), Duration::from_secs(86400)] {
            let formatted = format_duration(d);
            assert_eq!(parse_duration(&formatted).unwrap(), d);
        }
    }
}
