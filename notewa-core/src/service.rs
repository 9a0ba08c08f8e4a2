//! Trigger entry points: the scheduled sweep and the on-demand note check.
//!
//! Both build a candidate list from the persistence layer and hand it to
//! [`run_reminder_sweep`]; they differ only in how candidates are selected.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::candidate::ReminderCandidate;
use crate::dispatch::Dispatcher;
use crate::error::ReminderError;
use crate::reminders::{sweep_candidates, DispatchOutcome, SweepCancel, SweepOptions};
use crate::time::{parse_deadline, IMMINENT_WINDOW_HOURS};

/// Read contract the sweep needs from storage.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Incomplete notes with a deadline in `[window_start, window_end]`,
    /// joined with the owner's phone number.
    async fn fetch_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>, ReminderError>;

    /// A single note owned by `user_id`, whatever its state.
    async fn fetch_note(
        &self,
        note_id: &str,
        user_id: &str,
    ) -> Result<Option<ReminderCandidate>, ReminderError>;

    /// Remember successful sends so later sweeps can skip them.
    async fn record_reminders_sent(
        &self,
        _note_ids: &[String],
        _at: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        Ok(())
    }
}

/// Response shape returned to whoever triggered the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

impl SweepReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_sent()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Failed { .. }))
            .count()
    }
}

/// An on-demand check right after a note was created or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCheck {
    pub note_id: String,
    pub user_id: String,
    /// Overrides the stored deadline when present.
    pub deadline: Option<DateTime<Utc>>,
}

impl NoteCheck {
    pub fn new(note_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            user_id: user_id.into(),
            deadline: None,
        }
    }

    /// Parse the caller's deadline text up front; bad input never reaches the evaluator.
    pub fn with_raw_deadline(mut self, raw: &str) -> Result<Self, ReminderError> {
        self.deadline = Some(parse_deadline(raw)?);
        Ok(self)
    }
}

pub struct ReminderService<S, D> {
    source: S,
    dispatcher: D,
    options: SweepOptions,
    window: Duration,
    cancel: SweepCancel,
}

impl<S: CandidateSource, D: Dispatcher> ReminderService<S, D> {
    pub fn new(source: S, dispatcher: D) -> Self {
        Self {
            source,
            dispatcher,
            options: SweepOptions::default(),
            window: Duration::hours(IMMINENT_WINDOW_HOURS),
            cancel: SweepCancel::new(),
        }
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_window_hours(mut self, hours: i64) -> Self {
        self.window = Duration::hours(hours.max(1));
        self
    }

    /// Handle for cancelling sweeps run by this service.
    pub fn cancel_handle(&self) -> SweepCancel {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Periodic trigger: every candidate due in `[now, now + window]`.
    pub async fn run_scheduled(&self, now: DateTime<Utc>) -> Result<SweepReport, ReminderError> {
        self.dispatcher.ensure_ready()?;

        let candidates = self.source.fetch_candidates(now, now + self.window).await?;
        info!(count = candidates.len(), "found notes with approaching deadlines");

        self.sweep(candidates, now).await
    }

    /// On-demand trigger for a single note after a mutation.
    pub async fn check_note(&self, check: NoteCheck, now: DateTime<Utc>) -> Result<SweepReport, ReminderError> {
        self.dispatcher.ensure_ready()?;

        let mut candidate = self
            .source
            .fetch_note(&check.note_id, &check.user_id)
            .await?
            .ok_or_else(|| ReminderError::NoteNotFound(check.note_id.clone()))?;
        if check.deadline.is_some() {
            candidate.deadline = check.deadline;
        }

        self.sweep(vec![candidate], now).await
    }

    async fn sweep(&self, candidates: Vec<ReminderCandidate>, now: DateTime<Utc>) -> Result<SweepReport, ReminderError> {
        let run = sweep_candidates(&candidates, &self.dispatcher, now, &self.options, &self.cancel).await?;

        let sent: Vec<String> = run
            .outcomes
            .iter()
            .filter(|o| o.is_sent())
            .map(|o| o.note_id().to_string())
            .collect();
        if !sent.is_empty() && self.dispatcher.records_sends() {
            // The messages are already out; a bookkeeping failure must not hide that.
            if let Err(e) = self.source.record_reminders_sent(&sent, now).await {
                warn!(error = %e, "failed to record sent reminders");
            }
        }

        let outcomes = run.into_result()?;
        Ok(SweepReport {
            processed: candidates.len(),
            outcomes,
        })
    }
}
