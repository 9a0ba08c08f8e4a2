//! Read-only projection of a note that may need a reminder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note joined with its owner's phone number.
///
/// Sourced from the persistence layer; the sweep never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub note_id: String,
    pub title: String,

    /// Absolute deadline (UTC), if the note has one.
    pub deadline: Option<DateTime<Utc>>,

    /// Owner's phone as entered at registration. May be empty.
    pub phone_number: Option<String>,

    pub is_completed: bool,

    /// Last successful reminder for this note, if any.
    #[serde(default)]
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

impl ReminderCandidate {
    pub fn new(note_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            deadline: None,
            phone_number: None,
            is_completed: false,
            reminder_sent_at: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }

    pub fn with_reminder_sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_sent_at = Some(at);
        self
    }

    /// Phone number with surrounding whitespace removed; `None` when blank.
    pub fn phone(&self) -> Option<&str> {
        self.phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}
