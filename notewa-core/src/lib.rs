//! notewa-core: deadline evaluation and WhatsApp reminder dispatch for notes

pub mod candidate;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod phone;
pub mod reminders;
pub mod service;
pub mod time;

pub use candidate::ReminderCandidate;
pub use dispatch::{DispatchReceipt, Dispatcher};
pub use error::ReminderError;
pub use format::{format_deadline_jakarta, format_reminder, format_reminder_raw};
pub use phone::{normalize, to_dispatch_form, NormalizedPhone, COUNTRY_CODE};
pub use reminders::{
    evaluate, run_reminder_sweep, sweep_candidates, DispatchOutcome, SkipReason, SweepCancel,
    SweepOptions, SweepRun,
};
pub use service::{CandidateSource, NoteCheck, ReminderService, SweepReport};
pub use time::{
    classify, hours_until, parse_deadline, parse_local_deadline_to_utc, DeadlineClassification,
    JAKARTA,
};
