//! Creation-date heuristic.
//!
//! Registries label the creation date in many ways. The labels below are
//! tried in order against the WHOIS text and the first hit wins, so a more
//! specific label must come before a more generic one.

use crate::error::WhoisError;
use crate::types::AgeResult;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Creation-date labels, in match order.
pub const CREATION_DATE_LABELS: [&str; 9] = [
    "Creation Date:",
    "Created On:",
    "Domain Registration Date:",
    "Registered on:",
    "Creation date:",
    "registration:",
    "Created:",
    "Domain record activated:",
    "Create Date:",
];

/// Registrar date layouts understood by [`parse_creation_date`].
const DATE_FORMATS: [&str; 15] = [
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d %Y",
    "%Y%m%d",
];

/// Layouts with an explicit numeric offset.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S %z"];

lazy_static! {
    static ref LABEL_PATTERNS: Vec<Regex> = CREATION_DATE_LABELS
        .iter()
        .filter_map(|label| Regex::new(&format!("(?i){}(.*)", regex::escape(label))).ok())
        .collect();
}

/// Value after the first matching creation-date label, trimmed.
pub fn find_creation_date(text: &str) -> Option<String> {
    LABEL_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| caps[1].trim().to_string())
}

/// Best-effort parse of a registrar date.
///
/// Trailing timezone names such as `UTC` or `CLST` are tolerated.
pub fn parse_creation_date(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = raw
        .trim()
        .replace(" (UTC)", "")
        .replace(" UTC", "Z")
        .replace(" +0000", "Z");

    if let Some(dt) = parse_exact(&cleaned) {
        return Some(dt);
    }

    // Drop trailing words one at a time, e.g. "2001-03-14 00:00:00 CLST"
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    (1..words.len())
        .rev()
        .find_map(|n| parse_exact(&words[..n].join(" ")))
}

fn parse_exact(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(30)
}

/// Calendar distance between two instants as `(years, months, days)`.
///
/// The order of the arguments does not matter. A negative day count borrows
/// the length of the month before the later date.
pub fn elapsed_ymd(from: DateTime<Utc>, to: DateTime<Utc>) -> (u32, u32, u32) {
    let (start, end) = if from <= to { (from, to) } else { (to, from) };

    let mut years = end.year() - start.year();
    let mut months = end.month() as i32 - start.month() as i32;
    let mut days = end.day() as i32 - start.day() as i32;

    let start_time = start.num_seconds_from_midnight() as u64 * 1_000_000_000
        + start.nanosecond() as u64;
    let end_time = end.num_seconds_from_midnight() as u64 * 1_000_000_000
        + end.nanosecond() as u64;
    if end_time < start_time {
        days -= 1;
    }

    let (mut borrow_year, mut borrow_month) = (end.year(), end.month());
    while days < 0 {
        if borrow_month == 1 {
            borrow_year -= 1;
            borrow_month = 12;
        } else {
            borrow_month -= 1;
        }
        days += days_in_month(borrow_year, borrow_month) as i32;
        months -= 1;
    }

    while months < 0 {
        months += 12;
        years -= 1;
    }

    (years.max(0) as u32, months as u32, days as u32)
}

/// Find, parse and age the creation date in `text` relative to `now`.
///
/// # Errors
///
/// [`WhoisError::DateFieldNotFound`] when no label matches and
/// [`WhoisError::InvalidCreationDate`] when the value is not a date.
pub fn creation_age(domain: &str, text: &str, now: DateTime<Utc>) -> Result<AgeResult, WhoisError> {
    let raw = find_creation_date(text).ok_or_else(|| WhoisError::date_not_found(domain))?;
    let created_at = parse_creation_date(&raw).ok_or_else(|| WhoisError::invalid_date(&raw))?;
    let (years, months, days) = elapsed_ymd(created_at, now);

    Ok(AgeResult {
        creation_date: raw,
        created_at,
        years,
        months,
        days,
    })
}
