use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::time_utils::{current_year, localize};

/// Epoch values above this are read as milliseconds, anything else as seconds.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Largest instant a JavaScript-style date can hold, in milliseconds.
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// ── TimestampInput ────────────────────────────────────────────────────────────

/// The shapes a message timestamp arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    /// Already an absolute instant.
    Resolved(DateTime<Utc>),
    /// Unix epoch, seconds or milliseconds (see [`EPOCH_MILLIS_THRESHOLD`]).
    Epoch(f64),
    /// ISO-like, humanized (`May 3, 2024 @ 2:30pm`) or numeric text.
    Text(String),
}

impl TimestampInput {
    /// Classify a raw JSON value. Values that carry no time (null, booleans,
    /// arrays, objects, empty strings, zero) yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        if !is_truthy(value) {
            return None;
        }
        match value {
            Value::Number(n) => n.as_f64().map(TimestampInput::Epoch),
            Value::String(s) => Some(TimestampInput::Text(s.clone())),
            _ => None,
        }
    }

    /// Pick the first present, non-empty field of `record` among `fields`.
    ///
    /// Lookup stops at that field even when its value turns out not to be a
    /// timestamp shape.
    pub fn from_fields(record: &Value, fields: &[&str]) -> Option<Self> {
        fields
            .iter()
            .filter_map(|field| record.get(*field))
            .find(|v| is_truthy(v))
            .and_then(Self::from_json)
    }
}

/// Whether `value` counts as "set" for field selection.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── TimestampNormalizer ───────────────────────────────────────────────────────

/// Turns any [`TimestampInput`] into a UTC instant, or `None` when it cannot
/// be read.
///
/// Wall-clock text without an offset is interpreted in the configured zone.
/// Humanized text without a year uses [`Self::default_year`].
#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer {
    tz: Tz,
    default_year: i32,
}

impl TimestampNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            default_year: current_year(tz),
        }
    }

    /// Override the year assumed for humanized text that omits one.
    pub fn with_default_year(mut self, year: i32) -> Self {
        self.default_year = year;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn default_year(&self) -> i32 {
        self.default_year
    }

    /// Normalize one input. Never panics; unreadable input yields `None`.
    pub fn normalize(&self, input: &TimestampInput) -> Option<DateTime<Utc>> {
        match input {
            TimestampInput::Resolved(dt) => Some(truncate_millis(*dt)),
            TimestampInput::Epoch(value) => from_epoch(*value),
            TimestampInput::Text(s) => self.parse_text(s),
        }
    }

    /// Shorthand for classifying and normalizing a JSON value.
    pub fn normalize_json(&self, value: &Value) -> Option<DateTime<Utc>> {
        TimestampInput::from_json(value).and_then(|input| self.normalize(&input))
    }

    fn parse_text(&self, s: &str) -> Option<DateTime<Utc>> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }

        let parsed = self
            .parse_iso(trimmed)
            .or_else(|| self.parse_humanized(trimmed))
            .or_else(|| leading_integer(trimmed).and_then(|n| from_epoch(n as f64)));

        if parsed.is_none() {
            debug!("could not parse timestamp string \"{}\"", s);
        }
        parsed
    }

    fn parse_iso(&self, s: &str) -> Option<DateTime<Utc>> {
        // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(truncate_millis(dt.with_timezone(&Utc)));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        // Offset-less date-times are local wall-clock time.
        const LOCAL_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ];
        for fmt in LOCAL_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return localize(naive, self.tz).map(truncate_millis);
            }
        }

        // A bare date is midnight UTC.
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }

        None
    }

    /// `Month Day[, Year][ @ ]Hour:Minute[am|pm]`
    fn parse_humanized(&self, s: &str) -> Option<DateTime<Utc>> {
        let caps = humanized_pattern().captures(s)?;

        let month_name = caps.get(1)?.as_str().to_lowercase();
        let month = MONTHS
            .iter()
            .position(|m| *m == month_name || (month_name.len() == 3 && m.starts_with(&month_name)))?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = match caps.get(3) {
            Some(y) => y.as_str().parse().ok()?,
            None => self.default_year,
        };
        let mut hour: u32 = caps.get(4)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(5)?.as_str().parse().ok()?;

        match caps.get(6).map(|m| m.as_str().to_lowercase()).as_deref() {
            Some("pm") if hour != 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }

        let naive = NaiveDate::from_ymd_opt(year, month as u32 + 1, day)?.and_hms_opt(hour, minute, 0)?;
        localize(naive, self.tz)
    }
}

fn humanized_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\w+)\s+(\d+),?\s*(\d{4})?\s*@?\s*(\d{1,2}):(\d{2})\s*(am|pm)?")
            .expect("regex is valid")
    })
}

/// Convert an epoch number using the seconds/milliseconds heuristic.
///
/// Sub-millisecond precision is dropped.
pub fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value > EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    let millis = millis.trunc();
    if millis.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Parse the leading run of decimal digits (with optional sign), ignoring any
/// trailing text.
fn leading_integer(s: &str) -> Option<i64> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'-' => (-1, &s[1..]),
        b'+' => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

fn truncate_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
