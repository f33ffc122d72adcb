//! Mapping between UTC instants and civil days in a named time zone.
//!
//! Everything persisted or sent over the wire is a UTC instant. Day-level logic
//! (which day does this expense belong to, is this row "today") works on civil
//! dates projected into the caller's zone and must go through these helpers.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::trace;

use common::DateInput;

use crate::error::{ComputeError, Result};

/// Naive datetime layouts accepted besides RFC 3339.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Longest DST gap we are prepared to walk across, in minutes.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Parses an IANA zone name such as `America/Sao_Paulo`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ComputeError::InvalidTimezone(name.to_string()))
}

/// Parses any accepted date representation into a UTC instant.
///
/// Inputs without an offset are read as UTC.
pub fn normalize_to_utc(input: &DateInput) -> Result<DateTime<Utc>> {
    resolve_in_zone(input, Tz::UTC)
}

/// Parses a caller-supplied date, reading inputs without an offset as wall-clock time in `tz`.
///
/// Inputs carrying an explicit offset (RFC 3339) and millisecond timestamps are absolute
/// and ignore `tz`.
pub fn resolve_in_zone(input: &DateInput, tz: Tz) -> Result<DateTime<Utc>> {
    match input {
        DateInput::Millis(millis) => DateTime::<Utc>::from_timestamp_millis(*millis)
            .ok_or_else(|| ComputeError::InvalidDate(millis.to_string())),
        DateInput::Text(raw) => {
            let raw = raw.trim();

            if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
                return Ok(instant.with_timezone(&Utc));
            }

            for format in NAIVE_DATETIME_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                    trace!(%raw, format, "Parsed naive datetime");
                    return Ok(to_storage_utc(naive, tz));
                }
            }

            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                return Ok(civil_date_start(date, tz));
            }

            Err(ComputeError::InvalidDate(raw.to_string()))
        }
    }
}

/// Converts a wall-clock time in `tz` into the UTC instant to persist.
///
/// Ambiguous times (autumn fold) resolve to the earliest instant. Times that do not
/// exist (spring-forward gap) resolve to the first valid instant after the gap.
pub fn to_storage_utc(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(instant) => instant.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => first_instant_after_gap(local, tz),
    }
}

fn first_instant_after_gap(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let base = local.date().and_time(
        NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
            .unwrap_or(NaiveTime::MIN),
    );

    for step in 1..=MAX_GAP_MINUTES {
        let candidate = base + Duration::minutes(step);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            trace!(%local, %candidate, "Local time fell into a DST gap");
            return instant.with_timezone(&Utc);
        }
    }

    // No real zone has a gap this long; fall back to reading the wall clock as UTC.
    Utc.from_utc_datetime(&local)
}

/// Projects a UTC instant into `tz` for display.
pub fn to_local_display(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// The calendar date containing `instant` when seen from `tz`.
pub fn civil_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// UTC instant of local midnight (or the first instant after it, across a DST gap) of `date` in `tz`.
pub fn civil_date_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    to_storage_utc(date.and_time(NaiveTime::MIN), tz)
}

/// UTC instant at 00:00:00 local time of the civil day containing `instant`.
pub fn civil_day_start(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    civil_date_start(civil_date(instant, tz), tz)
}

/// Last millisecond of the civil day containing `instant`, in UTC.
pub fn civil_day_end(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let next = civil_date(instant, tz)
        .succ_opt()
        .map(|date| civil_date_start(date, tz))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    next - Duration::milliseconds(1)
}

/// True iff both instants fall on the same calendar day in `tz`.
pub fn is_same_civil_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    civil_date(a, tz) == civil_date(b, tz)
}

/// Number of days from `start` to `end`, both included. Zero or negative when `end < start`.
pub fn days_between_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}
