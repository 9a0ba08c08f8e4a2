//! The messaging-gateway seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReminderError;

/// Opaque success payload returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub detail: Option<String>,
    pub message_ids: Vec<String>,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Fail fast on misconfiguration (e.g. missing token) before a sweep starts.
    fn ensure_ready(&self) -> Result<(), ReminderError> {
        Ok(())
    }

    /// Whether a successful dispatch actually delivered a message.
    ///
    /// Stand-ins that only print return `false`, so their sweeps leave no
    /// sent-reminder marker behind.
    fn records_sends(&self) -> bool {
        true
    }

    /// Send one message. `phone` is already in dispatch form (`62...`).
    ///
    /// Exactly one outbound call per invocation; no retries.
    async fn dispatch(&self, phone: &str, message: &str) -> Result<DispatchReceipt, ReminderError>;
}

#[async_trait]
impl<D: Dispatcher + ?Sized> Dispatcher for std::sync::Arc<D> {
    fn ensure_ready(&self) -> Result<(), ReminderError> {
        (**self).ensure_ready()
    }

    fn records_sends(&self) -> bool {
        (**self).records_sends()
    }

    async fn dispatch(&self, phone: &str, message: &str) -> Result<DispatchReceipt, ReminderError> {
        (**self).dispatch(phone, message).await
    }
}
