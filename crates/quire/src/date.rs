use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid date '{0}'")]
pub struct InvalidDate(pub String);

/// Formats a front matter date (`2024-03-01`, `2024-03-01T09:30:00` or an
/// RFC 3339 timestamp) in the given time zone.
///
/// Dates without an offset are taken to be local to `timezone`.
pub fn format_date(date: &str, format: &str, timezone: Tz) -> Result<String, InvalidDate> {
    let invalid = || InvalidDate(date.to_string());

    let date = if date.contains('T') || date.contains(' ') {
        match DateTime::parse_from_rfc3339(date) {
            Ok(date) => date.with_timezone(&timezone),
            Err(_) => NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|_| invalid())?
                .and_local_timezone(timezone)
                .earliest()
                .ok_or_else(invalid)?,
        }
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| invalid())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?
            .and_local_timezone(timezone)
            .earliest()
            .ok_or_else(invalid)?
    };

    Ok(date.format(format).to_string())
}
