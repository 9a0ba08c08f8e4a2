use async_trait::async_trait;
use notewa_core::{DispatchReceipt, Dispatcher, ReminderError};

/// Prints what would be sent instead of calling the gateway.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDispatcher;

#[async_trait]
impl Dispatcher for DryRunDispatcher {
    fn records_sends(&self) -> bool {
        false
    }

    async fn dispatch(&self, phone: &str, message: &str) -> Result<DispatchReceipt, ReminderError> {
        println!("[DRY RUN] would send WhatsApp -> {phone}");
        for line in message.lines() {
            println!("    {line}");
        }
        Ok(DispatchReceipt {
            detail: Some("dry run".to_string()),
            ..DispatchReceipt::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_accepts_without_recording() {
        let d = DryRunDispatcher;
        assert!(d.ensure_ready().is_ok());
        assert!(!d.records_sends());

        let receipt = d.dispatch("6281234567890", "hai\nsampai nanti").await.unwrap();
        assert_eq!(receipt.detail.as_deref(), Some("dry run"));
        assert!(receipt.message_ids.is_empty());
    }
}
