//! Strict, locale-agnostic date parsing.
//!
//! A value is a date only if it matches one of the supported layouts in
//! full. There is no fuzzy or partial parsing: trailing text, missing
//! components, or out-of-range fields all yield a [`ParseFailure`].
//!
//! # Supported layouts
//!
//! | Layout | Example |
//! |--------|---------|
//! | RFC 3339 | `2021-03-04T05:06:07+02:00` |
//! | `%Y-%m-%d %H:%M:%S` | `2021-03-04 05:06:07` |
//! | `%Y-%m-%dT%H:%M:%S` | `2021-03-04T05:06:07` |
//! | `%Y-%m-%d %H:%M` | `2021-03-04 05:06` |
//! | `%Y-%m-%d` | `2021-03-04` |
//! | `%Y/%m/%d` | `2021/03/04` |
//! | `%d.%m.%Y` | `04.03.2021` |
//! | `%m/%d/%Y` | `03/04/2021` |
//! | `%Y%m%d` (8 digits) | `20210304` |
//!
//! # Example
//!
//! ```
//! use u_partition::date::parse_date;
//!
//! let d = parse_date("2021-01-02").unwrap();
//! assert_eq!(d.days_since_epoch(), 18629.0);
//! assert!(parse_date("2021-01-02 garbage").is_err());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A successfully parsed date or timestamp (timezone-naive, UTC for offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParsedDate(NaiveDateTime);

impl ParsedDate {
    /// Returns the underlying timestamp.
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Position on the timestamp axis used for binning and clustering:
    /// fractional days since 1970-01-01T00:00:00.
    pub fn days_since_epoch(&self) -> f64 {
        self.0.and_utc().timestamp() as f64 / SECONDS_PER_DAY
    }
}

impl fmt::Display for ParsedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.time() == NaiveTime::MIN {
            write!(f, "{}", self.0.date())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The input did not match any supported date layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' is not a recognized date")]
pub struct ParseFailure {
    /// The offending input, trimmed.
    pub input: String,
}

impl ParseFailure {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Parses `text` under the strict layouts listed in the module docs.
pub fn parse_date(text: &str) -> Result<ParsedDate, ParseFailure> {
    let s = text.trim();

    if let Some(date) = parse_compact(s) {
        return Ok(ParsedDate(date.and_time(NaiveTime::MIN)));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(ParsedDate(dt.naive_utc()));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ParsedDate(dt));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(ParsedDate(d.and_time(NaiveTime::MIN)));
        }
    }

    Err(ParseFailure::new(s))
}

/// `YYYYMMDD` with exactly eight ASCII digits.
fn parse_compact(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
