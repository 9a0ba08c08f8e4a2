//! Time utilities: deadline parsing and deadline-proximity classification.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ReminderError;

/// Civil time used for every user-facing deadline (WIB, UTC+7, no DST).
pub const JAKARTA: Tz = chrono_tz::Asia::Jakarta;

/// Deadlines at most this many hours ahead are imminent.
pub const IMMINENT_WINDOW_HOURS: i64 = 24;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Where a deadline sits relative to "now".
///
/// Every variant carries the signed hour delta, ceiling-rounded:
/// `Past` iff delta <= 0, `ImminentWithinHours` iff 0 < delta <= 24,
/// `Future` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineClassification {
    Past(i64),
    ImminentWithinHours(i64),
    Future(i64),
}

impl DeadlineClassification {
    pub fn delta_hours(&self) -> i64 {
        match *self {
            Self::Past(h) | Self::ImminentWithinHours(h) | Self::Future(h) => h,
        }
    }

    pub fn is_imminent(&self) -> bool {
        matches!(self, Self::ImminentWithinHours(_))
    }
}

/// Signed hours from `now` until `deadline`, rounded up (`ceil`) on the
/// fractional difference.
pub fn hours_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds() as f64;
    (millis / MILLIS_PER_HOUR).ceil() as i64
}

/// Classify a deadline against an injected `now`.
pub fn classify(deadline: DateTime<Utc>, now: DateTime<Utc>) -> DeadlineClassification {
    let delta = hours_until(deadline, now);
    if delta <= 0 {
        DeadlineClassification::Past(delta)
    } else if delta <= IMMINENT_WINDOW_HOURS {
        DeadlineClassification::ImminentWithinHours(delta)
    } else {
        DeadlineClassification::Future(delta)
    }
}

/// Parse a deadline like "2026-02-20 23:59" in an IANA tz like "Asia/Jakarta",
/// returning UTC.
pub fn parse_local_deadline_to_utc(local: &str, tz: Tz) -> Result<DateTime<Utc>, ReminderError> {
    let trimmed = local.trim();
    let ndt = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
        .map_err(|e| ReminderError::InvalidDeadline(format!("'{local}': {e}")))?;

    let local_dt = tz.from_local_datetime(&ndt).single().ok_or_else(|| {
        ReminderError::InvalidDeadline(format!("ambiguous or invalid local time: {local} {tz}"))
    })?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Parse a caller-supplied deadline: RFC 3339 first, then Jakarta local time.
pub fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, ReminderError> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => parse_local_deadline_to_utc(raw, JAKARTA),
    }
}
