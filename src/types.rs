//! Reference canonicalizers, registered by
//! [`TypeRegistry::with_builtins`](crate::registry::TypeRegistry::with_builtins).
//!
//! Each one maps a raw attribute value to the form that is significant for
//! storage. Errors are plain reasons; the schema attaches keyword and value.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::key::Key;

lazy_static! {
    static ref RELATIVE_DATE: Regex = Regex::new(r"^(0|-[0-9]+)$").unwrap();
    static ref COMPACT_DATE: Regex = Regex::new(r"^[0-9]{8}$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
    static ref TIME: Regex = Regex::new(r"^([0-9]{1,2}):?([0-9]{2})?$").unwrap();
    static ref EXPVER: Regex = Regex::new(r"^[0-9A-Za-z]{1,4}$").unwrap();
}

pub fn identity(raw: &str, _context: &Key) -> Result<String, String> {
    Ok(raw.to_string())
}

// Dates are either absolute (YYYYMMDD or YYYY-MM-DD) or a non-positive day
// offset from today.
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    if RELATIVE_DATE.is_match(raw) {
        let offset: i64 = raw.parse().map_err(|_| format!("bad day offset '{raw}'"))?;
        return Ok(Utc::now().date_naive() + Duration::days(offset));
    }
    let format = if COMPACT_DATE.is_match(raw) {
        "%Y%m%d"
    } else if ISO_DATE.is_match(raw) {
        "%Y-%m-%d"
    } else {
        return Err(format!("'{raw}' is not a date"));
    };
    NaiveDate::parse_from_str(raw, format).map_err(|e| e.to_string())
}

pub fn date(raw: &str, _context: &Key) -> Result<String, String> {
    Ok(parse_date(raw)?.format("%Y%m%d").to_string())
}

/// Daily climatologies are stored per day of the year, so only `MMDD` remains.
pub fn climate_daily(raw: &str, _context: &Key) -> Result<String, String> {
    Ok(parse_date(raw)?.format("%m%d").to_string())
}

/// Monthly climatologies keep the month number alone.
pub fn climate_monthly(raw: &str, _context: &Key) -> Result<String, String> {
    Ok(parse_date(raw)?.month().to_string())
}

/// Steps and step ranges (`02-12`) lose their leading zeros.
pub fn step(raw: &str, _context: &Key) -> Result<String, String> {
    let mut parts = Vec::new();
    for part in raw.split('-') {
        if part.is_empty() {
            return Err(format!("'{raw}' is not a step or a step range"));
        }
        let trimmed = part.trim_start_matches('0');
        if trimmed.is_empty() || !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            parts.push(format!("0{trimmed}"));
        } else {
            parts.push(trimmed.to_string());
        }
    }
    Ok(parts.join("-"))
}

/// Experiment versions are four characters; numeric ones are zero padded.
pub fn expver(raw: &str, _context: &Key) -> Result<String, String> {
    if !EXPVER.is_match(raw) {
        return Err(format!("'{raw}' is not an experiment version"));
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        Ok(format!("{raw:0>4}"))
    } else if raw.len() == 4 {
        Ok(raw.to_string())
    } else {
        Err(format!("'{raw}' is neither numeric nor four characters"))
    }
}

/// Times become `HHMM`; a bare hour such as `6` means `0600`.
pub fn time(raw: &str, _context: &Key) -> Result<String, String> {
    let captures = TIME.captures(raw).ok_or_else(|| format!("'{raw}' is not a time"))?;
    let hours: u32 = captures[1].parse().map_err(|_| format!("'{raw}' is not a time"))?;
    let minutes: u32 = match captures.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| format!("'{raw}' is not a time"))?,
        None => 0,
    };
    if hours > 23 || minutes > 59 {
        return Err(format!("'{raw}' is out of range"));
    }
    Ok(format!("{hours:02}{minutes:02}"))
}

pub fn integer(raw: &str, _context: &Key) -> Result<String, String> {
    raw.parse::<i64>()
        .map(|i| i.to_string())
        .map_err(|_| format!("'{raw}' is not an integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(f: fn(&str, &Key) -> Result<String, String>, raw: &str) -> String {
        f(raw, &Key::new()).unwrap()
    }

    #[test]
    fn climate_dates() {
        assert_eq!(apply(climate_daily, "20210427"), "0427");
        assert_eq!(apply(climate_monthly, "20210427"), "4");
        assert_eq!(apply(climate_monthly, "2021-11-02"), "11");
        assert!(climate_daily("2021", &Key::new()).is_err());
    }

    #[test]
    fn relative_dates_count_back_from_today() {
        let expected = (Utc::now().date_naive() - Duration::days(2)).format("%Y%m%d").to_string();
        assert_eq!(apply(date, "-2"), expected);
        assert_eq!(apply(date, "20210427"), "20210427");
        assert!(date("20211332", &Key::new()).is_err());
    }

    #[test]
    fn steps_drop_leading_zeros() {
        assert_eq!(apply(step, "02-12"), "2-12");
        assert_eq!(apply(step, "0"), "0");
        assert_eq!(apply(step, "000"), "0");
        assert_eq!(apply(step, "012"), "12");
        assert!(step("3-", &Key::new()).is_err());
    }

    #[test]
    fn expver_and_time_padding() {
        assert_eq!(apply(expver, "1"), "0001");
        assert_eq!(apply(expver, "7799"), "7799");
        assert_eq!(apply(expver, "abcd"), "abcd");
        assert!(expver("abc", &Key::new()).is_err());
        assert!(expver("12345", &Key::new()).is_err());
        assert_eq!(apply(time, "6"), "0600");
        assert_eq!(apply(time, "0000"), "0000");
        assert_eq!(apply(time, "12:30"), "1230");
        assert!(time("25", &Key::new()).is_err());
    }

    #[test]
    fn integers_normalise() {
        assert_eq!(apply(integer, "050"), "50");
        assert_eq!(apply(integer, "-3"), "-3");
        assert!(integer("0.5", &Key::new()).is_err());
    }
}
