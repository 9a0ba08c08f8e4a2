use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notewa_core::{CandidateSource, ReminderCandidate, ReminderError};

use crate::file_store::FileStore;

fn fetch_error(e: anyhow::Error) -> ReminderError {
    ReminderError::CandidateFetch(format!("{e:#}"))
}

#[async_trait]
impl CandidateSource for FileStore {
    async fn fetch_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>, ReminderError> {
        self.candidates_between(window_start, window_end).map_err(fetch_error)
    }

    async fn fetch_note(
        &self,
        note_id: &str,
        user_id: &str,
    ) -> Result<Option<ReminderCandidate>, ReminderError> {
        self.note_candidate(note_id, user_id).map_err(fetch_error)
    }

    async fn record_reminders_sent(&self, note_ids: &[String], at: DateTime<Utc>) -> Result<(), ReminderError> {
        self.mark_reminded(note_ids, at).map_err(fetch_error)
    }
}
