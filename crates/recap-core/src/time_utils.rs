use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a user-supplied zone name into a [`Tz`].
///
/// `"auto"` (any case) or an empty string selects the system zone. Names that
/// are not recognised fall back to UTC with a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let wanted = if name.is_empty() || name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };

    wanted.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", wanted);
        Tz::UTC
    })
}

/// Interpret a wall-clock time in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// fall into a DST gap are shifted forward by one hour.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current calendar year as seen from `tz`.
pub fn current_year(tz: Tz) -> i32 {
    Utc::now().with_timezone(&tz).year()
}

// ── CalendarSlot ──────────────────────────────────────────────────────────────

/// The calendar cells one instant falls into, seen from a given zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSlot {
    pub date: NaiveDate,
    pub year: i32,
    /// `0..24`
    pub hour: usize,
    /// `0..7`, Sunday = 0.
    pub weekday: usize,
    /// `0..12`, January = 0.
    pub month: usize,
}

impl CalendarSlot {
    pub fn of(dt: DateTime<Utc>, tz: Tz) -> Self {
        let local = dt.with_timezone(&tz);
        Self {
            date: local.date_naive(),
            year: local.year(),
            hour: local.hour() as usize,
            weekday: local.weekday().num_days_from_sunday() as usize,
            month: local.month0() as usize,
        }
    }
}

// ── ISO formatting ────────────────────────────────────────────────────────────

/// Render as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_iso_millis(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter writing timestamps as millisecond ISO strings in UTC.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso_millis(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
