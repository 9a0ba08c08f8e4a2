//! Reminder sweep: evaluate candidates, format, normalize and dispatch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::candidate::ReminderCandidate;
use crate::dispatch::Dispatcher;
use crate::error::ReminderError;
use crate::format::format_reminder;
use crate::phone::normalize;
use crate::time::{classify, DeadlineClassification, IMMINENT_WINDOW_HOURS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Completed,
    NoDeadline,
    NotImminent,
    Past,
    AlreadyReminded,
    NoPhone,
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoDeadline => "no-deadline",
            Self::NotImminent => "not-imminent",
            Self::Past => "past",
            Self::AlreadyReminded => "already-reminded",
            Self::NoPhone => "no-phone",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-candidate result of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent {
        note_id: String,
        phone_number: String,
        hours_diff: i64,
    },
    Skipped {
        note_id: String,
        reason: SkipReason,
    },
    Failed {
        note_id: String,
        #[serde(serialize_with = "serialize_error")]
        error: ReminderError,
    },
}

fn serialize_error<S: Serializer>(error: &ReminderError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

impl DispatchOutcome {
    pub fn note_id(&self) -> &str {
        match self {
            Self::Sent { note_id, .. } | Self::Skipped { note_id, .. } | Self::Failed { note_id, .. } => {
                note_id
            }
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    /// Dispatches in flight at once (at least 1).
    pub max_concurrency: usize,
    /// Upper bound for a single gateway call.
    pub dispatch_timeout: StdDuration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            dispatch_timeout: StdDuration::from_secs(15),
        }
    }
}

/// Shared cancellation flag for a running sweep.
///
/// Dispatches already in flight finish; candidates not yet started are
/// reported as `skipped(cancelled)`.
#[derive(Debug, Clone, Default)]
pub struct SweepCancel(Arc<AtomicBool>);

impl SweepCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decide whether a candidate should be reminded now.
///
/// Returns the (positive) hours left when a reminder is due, or the reason it
/// is skipped. Phone validity is not checked beyond presence.
pub fn evaluate(candidate: &ReminderCandidate, now: DateTime<Utc>) -> Result<i64, SkipReason> {
    if candidate.is_completed {
        return Err(SkipReason::Completed);
    }
    let deadline = candidate.deadline.ok_or(SkipReason::NoDeadline)?;

    let hours = match classify(deadline, now) {
        DeadlineClassification::Future(_) => return Err(SkipReason::NotImminent),
        DeadlineClassification::Past(_) => return Err(SkipReason::Past),
        DeadlineClassification::ImminentWithinHours(h) => h,
    };

    // One reminder per 24h window before the deadline.
    if let Some(sent_at) = candidate.reminder_sent_at {
        if sent_at >= deadline - Duration::hours(IMMINENT_WINDOW_HOURS) {
            return Err(SkipReason::AlreadyReminded);
        }
    }

    if candidate.phone().is_none() {
        return Err(SkipReason::NoPhone);
    }

    Ok(hours)
}

/// Everything a sweep produced, including the error that stopped it early.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRun {
    pub outcomes: Vec<DispatchOutcome>,
    /// Set when a dispatch reported [`ReminderError::GatewayAuth`]; later
    /// candidates were not attempted.
    pub halted: Option<ReminderError>,
}

impl SweepRun {
    pub fn into_result(self) -> Result<Vec<DispatchOutcome>, ReminderError> {
        match self.halted {
            Some(error) => Err(error),
            None => Ok(self.outcomes),
        }
    }
}

/// Like [`run_reminder_sweep`], but keeps the outcomes of a halted sweep so
/// messages that already went out can still be recorded.
pub async fn sweep_candidates<D: Dispatcher + ?Sized>(
    candidates: &[ReminderCandidate],
    dispatcher: &D,
    now: DateTime<Utc>,
    options: &SweepOptions,
    cancel: &SweepCancel,
) -> Result<SweepRun, ReminderError> {
    dispatcher.ensure_ready()?;

    let halted = AtomicBool::new(false);
    let outcomes: Vec<DispatchOutcome> = stream::iter(candidates)
        .map(|c| process_candidate(c, dispatcher, now, options, cancel, &halted))
        .buffered(options.max_concurrency.max(1))
        .collect()
        .await;

    Ok(SweepRun {
        outcomes,
        halted: halted.load(Ordering::SeqCst).then_some(ReminderError::GatewayAuth),
    })
}

/// Run one sweep over `candidates`.
///
/// Always yields exactly one outcome per candidate, in input order.
/// Per-candidate failures are recorded, never propagated; only
/// [`ReminderError::GatewayAuth`] aborts the sweep.
pub async fn run_reminder_sweep<D: Dispatcher + ?Sized>(
    candidates: &[ReminderCandidate],
    dispatcher: &D,
    now: DateTime<Utc>,
    options: &SweepOptions,
    cancel: &SweepCancel,
) -> Result<Vec<DispatchOutcome>, ReminderError> {
    sweep_candidates(candidates, dispatcher, now, options, cancel)
        .await?
        .into_result()
}

async fn process_candidate<D: Dispatcher + ?Sized>(
    candidate: &ReminderCandidate,
    dispatcher: &D,
    now: DateTime<Utc>,
    options: &SweepOptions,
    cancel: &SweepCancel,
    halted: &AtomicBool,
) -> DispatchOutcome {
    let note_id = candidate.note_id.clone();

    let hours = match evaluate(candidate, now) {
        Ok(h) => h,
        Err(reason) => {
            debug!(note_id = %note_id, %reason, "reminder skipped");
            return DispatchOutcome::Skipped { note_id, reason };
        }
    };

    if cancel.is_cancelled() || halted.load(Ordering::SeqCst) {
        return DispatchOutcome::Skipped {
            note_id,
            reason: SkipReason::Cancelled,
        };
    }

    // evaluate() guarantees both are present.
    let (Some(deadline), Some(raw_phone)) = (candidate.deadline, candidate.phone()) else {
        return DispatchOutcome::Skipped {
            note_id,
            reason: SkipReason::NoPhone,
        };
    };

    let message = format_reminder(&candidate.title, deadline, now);
    let phone = match normalize(raw_phone) {
        Ok(p) => p.dispatch_form(),
        Err(error) => {
            warn!(note_id = %note_id, %error, "reminder not sent");
            return DispatchOutcome::Failed { note_id, error };
        }
    };

    let result = tokio::time::timeout(options.dispatch_timeout, dispatcher.dispatch(&phone, &message))
        .await
        .unwrap_or_else(|_| {
            Err(ReminderError::GatewayRequest(format!(
                "timed out after {:?}",
                options.dispatch_timeout
            )))
        });

    match result {
        Ok(receipt) => {
            info!(
                note_id = %note_id,
                phone = %phone,
                hours_diff = hours,
                detail = receipt.detail.as_deref().unwrap_or(""),
                "reminder sent"
            );
            DispatchOutcome::Sent {
                note_id,
                phone_number: phone,
                hours_diff: hours,
            }
        }
        Err(error) => {
            if error == ReminderError::GatewayAuth {
                halted.store(true, Ordering::SeqCst);
            }
            warn!(note_id = %note_id, %error, "reminder not sent");
            DispatchOutcome::Failed { note_id, error }
        }
    }
}
