use crate::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Which end of a range a bare date stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// A bare date means its first millisecond
    Start,
    /// A bare date means its last millisecond
    End,
}

/// Parses an ISO-8601 timestamp or calendar date
///
/// Full timestamps must carry an offset (`Z` or `±hh:mm`). A bare
/// `YYYY-MM-DD` covers the whole UTC day, so both bounds stay inclusive.
pub fn parse_timestamp(
    name: &'static str,
    value: &str,
    bound: DateBound,
) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let invalid = || ValidationError::InvalidDate {
        name,
        value: value.to_string(),
    };

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = match bound {
        DateBound::Start => NaiveTime::MIN,
        DateBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or_else(invalid)?,
    };
    Ok(date.and_time(time).and_utc())
}
