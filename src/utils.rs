use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::Timestamp;

/// Parses a timestamp from text.
///
/// Accepts RFC 3339 with any offset (converted to UTC), a naive
/// `%Y-%m-%d %H:%M:%S` / `%Y-%m-%dT%H:%M:%S` date-time taken as UTC, or a bare
/// `%Y-%m-%d` date which is read as midnight UTC.
///
/// # Examples
///
/// ```
/// use timeseries_collection::utils::parse_timestamp;
///
/// let ts = parse_timestamp("2015-04-09").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2015-04-09T00:00:00+00:00");
/// ```
pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Parse(format!("bad timestamp {s:?}: {e}")))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Formats a timestamp as RFC 3339 in UTC with a `Z` suffix.
///
/// Sub-second digits are only emitted when present, so whole-second instants
/// print as `2015-04-09T00:00:00Z`.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Formats a value so that [`parse_value`] recovers exactly the same `f64`.
pub fn format_value(v: f64) -> String {
    v.to_string()
}

/// Parses a value written by [`format_value`].
pub fn parse_value(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| Error::Parse(format!("bad value {s:?}: {e}")))
}
