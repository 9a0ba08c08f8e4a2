use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReminderError {
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    #[error("invalid deadline {0}")]
    InvalidDeadline(String),

    #[error("gateway token not configured")]
    GatewayAuth,

    #[error("gateway request failed: {0}")]
    GatewayRequest(String),

    #[error("{0}")]
    GatewayRejected(String),

    #[error("failed to fetch reminder candidates: {0}")]
    CandidateFetch(String),

    #[error("note not found: {0}")]
    NoteNotFound(String),
}

impl ReminderError {
    /// Sweep-level errors abort the whole sweep; everything else is recorded
    /// against a single candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::GatewayAuth | Self::CandidateFetch(_) | Self::NoteNotFound(_) | Self::InvalidDeadline(_)
        )
    }
}
