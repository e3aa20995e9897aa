//! Date parsing for query strings and request bodies.
//!
//! Clients send either full RFC 3339 timestamps or bare `YYYY-MM-DD` dates.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a timestamp; a bare date means midnight UTC.
pub fn parse_datetime(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| invalid(field))
}

/// Parse a calendar date; a timestamp keeps its UTC date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| invalid(field))
}

/// Parse an optional value, treating blank as absent.
pub fn parse_optional<T>(
    field: &'static str,
    value: Option<&str>,
    parse: fn(&'static str, &str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse(field, v).map(Some),
        None => Ok(None),
    }
}

fn invalid(field: &'static str) -> ValidationError {
    ValidationError::InvalidFormat {
        field,
        reason: "fecha no válida, use AAAA-MM-DD o RFC 3339",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn bare_date_is_midnight_utc() {
        let ts = parse_datetime("desde", "2024-05-01").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2024, 5, 1, 0));
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let ts = parse_datetime("fecha_inicio", "2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn timestamp_as_date_keeps_utc_day() {
        let date = parse_date("fecha", "2024-05-01T23:30:00-03:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn garbage_is_rejected_with_field() {
        match parse_date("fecha_fin", "mañana") {
            Err(ValidationError::InvalidFormat { field, .. }) => assert_eq!(field, "fecha_fin"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(parse_optional("desde", Some("  "), parse_date), Ok(None));
        assert_eq!(parse_optional("desde", None, parse_date), Ok(None));
        assert!(parse_optional("desde", Some("2024-01-01"), parse_date).unwrap().is_some());
    }
}
