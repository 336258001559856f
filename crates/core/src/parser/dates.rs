//! Date resolution for scraped text.
//!
//! Listing and detail pages express dates loosely: "3 days ago", "9am",
//! "Oct. 3rd '23", "March 15, 2024 (Steam)". Everything here returns `None`
//! for text it cannot resolve; `None` is the "unknown" date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Upper bound on the amount in "N units ago".
const MAX_AMOUNT: i64 = 100_000;

static LONG_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+|an?)\s+(second|minute|hour|day|week|month|year)s?\s+ago\b").unwrap()
});

static SHORT_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(secs?|mins?|hrs?|h|d|w|mos?|y)\.?\s+ago\b").unwrap()
});

static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)$").unwrap());

static DAY_OF_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s*'(\d{2})|,?\s+(\d{4}))?$")
        .unwrap()
});

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());

static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());

const GAME_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
];

fn unit_seconds(unit: &str) -> Option<i64> {
    let unit = unit.to_ascii_lowercase();
    let seconds = match unit.as_str() {
        "second" | "sec" | "secs" => 1,
        "minute" | "min" | "mins" => MINUTE,
        "hour" | "h" | "hr" | "hrs" => HOUR,
        "day" | "d" => DAY,
        "week" | "w" => WEEK,
        "month" | "mo" | "mos" => MONTH,
        "year" | "y" => YEAR,
        _ => return None,
    };
    Some(seconds)
}

fn amount(text: &str) -> Option<i64> {
    match text.to_ascii_lowercase().as_str() {
        "a" | "an" => Some(1),
        digits => digits.parse::<i64>().ok().filter(|n| *n <= MAX_AMOUNT),
    }
}

fn ago(now: DateTime<Utc>, amount: i64, unit_secs: i64) -> Option<NaiveDate> {
    let offset = Duration::try_seconds(amount.checked_mul(unit_secs)?)?;
    now.checked_sub_signed(offset).map(|t| t.date_naive())
}

/// Resolve "N units ago" (long or abbreviated), "just now", "today" and
/// "yesterday" against `now`.
pub fn resolve_relative(text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "just now" | "now" | "today" => return Some(now.date_naive()),
        "yesterday" => return ago(now, 1, DAY),
        _ => {}
    }

    let caps = LONG_RELATIVE
        .captures(text)
        .or_else(|| SHORT_RELATIVE.captures(text))?;
    let n = amount(caps.get(1)?.as_str())?;
    let unit = unit_seconds(caps.get(2)?.as_str())?;
    ago(now, n, unit)
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Resolve a date as shown on listing and detail pages.
///
/// Accepts relative expressions, a clock time (an upload from today), a day
/// of month with optional year (`Oct. 3rd`, `Oct. 3rd '23`, `Oct 3, 2023`)
/// and ISO dates. A day without a year is the latest such day not after
/// `now`. Dates more than a day in the future are rejected.
pub fn resolve_listing_date(text: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    let today = now.date_naive();

    let resolved = if let Some(date) = resolve_relative(&text, now) {
        Some(date)
    } else if let Some(caps) = CLOCK.captures(&text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
        (1..=12).contains(&hour).then_some(())?;
        (minute < 60).then_some(today)
    } else if let Some(caps) = DAY_OF_MONTH.captures(&text) {
        let month = month_from_name(caps.get(1)?.as_str())?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        if let Some(short) = caps.get(3) {
            let year = 2000 + short.as_str().parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        } else if let Some(full) = caps.get(4) {
            NaiveDate::from_ymd_opt(full.as_str().parse().ok()?, month, day)
        } else {
            match NaiveDate::from_ymd_opt(today.year(), month, day) {
                Some(date) if date <= today => Some(date),
                _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day),
            }
        }
    } else if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        Some(date)
    } else {
        DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|t| t.with_timezone(&Utc).date_naive())
    };

    resolved.filter(|date| *date <= today + Duration::days(1))
}

/// Parse a game release date such as `March 15, 2024 (Steam)`,
/// `15/03/2024`, `March 2024` or `2024`.
///
/// Partial dates resolve to the first day of the month or year.
pub fn parse_game_date(text: &str) -> Option<NaiveDate> {
    let cleaned = BRACKETED.replace_all(text, " ");
    let cleaned = ORDINAL.replace_all(&cleaned, "$1");
    let cleaned = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == ',' || c == ';' || c.is_whitespace());
    if cleaned.is_empty() {
        return None;
    }

    for format in GAME_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }

    // "March 2024" / "Mar 2024"
    let mut words = cleaned.split(' ');
    if let (Some(first), Some(second), None) = (words.next(), words.next(), words.next()) {
        if let (Some(month), Ok(year)) = (month_from_name(first), second.parse::<i32>()) {
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }

    let year: i32 = YEAR_ONLY.captures(cleaned)?.get(1)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_long_relative_forms() {
        assert_eq!(resolve_relative("3 days ago", now()), date(2024, 6, 12));
        assert_eq!(resolve_relative("1 week ago", now()), date(2024, 6, 8));
        assert_eq!(resolve_relative("2 months ago", now()), date(2024, 4, 16));
        assert_eq!(resolve_relative("1 year ago", now()), date(2023, 6, 16));
        assert_eq!(resolve_relative("13 hours ago", now()), date(2024, 6, 14));
        assert_eq!(resolve_relative("an hour ago", now()), date(2024, 6, 15));
        assert_eq!(resolve_relative("A Day Ago", now()), date(2024, 6, 14));
    }

    #[test]
    fn test_short_relative_forms() {
        assert_eq!(resolve_relative("5 min ago", now()), date(2024, 6, 15));
        assert_eq!(resolve_relative("2d ago", now()), date(2024, 6, 13));
        assert_eq!(resolve_relative("3 hrs ago", now()), date(2024, 6, 15));
        assert_eq!(resolve_relative("2 w ago", now()), date(2024, 6, 1));
        assert_eq!(resolve_relative("1 mo ago", now()), date(2024, 5, 16));
        assert_eq!(resolve_relative("1y ago", now()), date(2023, 6, 16));
    }

    #[test]
    fn test_relative_keywords() {
        assert_eq!(resolve_relative("just now", now()), date(2024, 6, 15));
        assert_eq!(resolve_relative("Yesterday", now()), date(2024, 6, 14));
    }

    #[test]
    fn test_unresolvable_relative_is_unknown() {
        assert_eq!(resolve_relative("sometime soon", now()), None);
        assert_eq!(resolve_relative("3 fortnights ago", now()), None);
        assert_eq!(resolve_relative("", now()), None);
        assert_eq!(resolve_relative("99999999999 years ago", now()), None);
    }

    #[test]
    fn test_listing_clock_form_is_today() {
        assert_eq!(resolve_listing_date("9am", now()), date(2024, 6, 15));
        assert_eq!(resolve_listing_date("11:30 pm", now()), date(2024, 6, 15));
        assert_eq!(resolve_listing_date("13pm", now()), None);
    }

    #[test]
    fn test_listing_day_forms() {
        assert_eq!(resolve_listing_date("Oct. 3rd '23", now()), date(2023, 10, 3));
        assert_eq!(resolve_listing_date("Jun. 1st", now()), date(2024, 6, 1));
        // A day later in the year than today belongs to last year.
        assert_eq!(resolve_listing_date("Dec. 24th", now()), date(2023, 12, 24));
        assert_eq!(resolve_listing_date("Feb 30th", now()), None);
        assert_eq!(resolve_listing_date("March 3, 2022", now()), date(2022, 3, 3));
    }

    #[test]
    fn test_listing_iso_and_relative() {
        assert_eq!(resolve_listing_date("2024-01-02", now()), date(2024, 1, 2));
        assert_eq!(resolve_listing_date("  4 days   ago ", now()), date(2024, 6, 11));
        assert_eq!(
            resolve_listing_date("2024-02-03T10:00:00Z", now()),
            date(2024, 2, 3)
        );
    }

    #[test]
    fn test_listing_rejects_future_and_garbage() {
        assert_eq!(resolve_listing_date("2030-01-01", now()), None);
        assert_eq!(resolve_listing_date("n/a", now()), None);
        assert_eq!(resolve_listing_date("", now()), None);
    }

    #[test]
    fn test_game_date_formats() {
        assert_eq!(parse_game_date("March 15, 2024"), date(2024, 3, 15));
        assert_eq!(parse_game_date("Mar 15, 2024"), date(2024, 3, 15));
        assert_eq!(parse_game_date("15 March 2024"), date(2024, 3, 15));
        assert_eq!(parse_game_date("2024-03-15"), date(2024, 3, 15));
        assert_eq!(parse_game_date("15/03/2024"), date(2024, 3, 15));
        assert_eq!(parse_game_date("03/25/2024"), date(2024, 3, 25));
    }

    #[test]
    fn test_game_date_partial_and_noise() {
        assert_eq!(parse_game_date("March 2024"), date(2024, 3, 1));
        assert_eq!(parse_game_date("2019"), date(2019, 1, 1));
        assert_eq!(parse_game_date("March 15th, 2024 (Steam)"), date(2024, 3, 15));
        assert_eq!(parse_game_date("[PC] 2024-03-15."), date(2024, 3, 15));
        assert_eq!(parse_game_date("TBA"), None);
        assert_eq!(parse_game_date("(unknown)"), None);
    }
}
