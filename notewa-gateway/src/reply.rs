//! Typed decoding of the gateway's JSON replies.

use notewa_core::{DispatchReceipt, ReminderError};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_REJECTION: &str = "Failed to send WhatsApp";

/// What the gateway said, decoded once at the HTTP boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply {
    Accepted(DispatchReceipt),
    Rejected(String),
    Malformed(String),
}

#[derive(Deserialize)]
struct Wire {
    status: bool,
    reason: Option<String>,
    detail: Option<String>,
    #[serde(default)]
    id: Value,
}

impl GatewayReply {
    pub fn decode(body: &str) -> Self {
        let raw: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return Self::Malformed(body.to_string()),
        };
        let wire: Wire = match serde_json::from_value(raw.clone()) {
            Ok(w) => w,
            Err(_) => return Self::Malformed(body.to_string()),
        };

        if !wire.status {
            return Self::Rejected(
                wire.reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            );
        }

        Self::Accepted(DispatchReceipt {
            detail: wire.detail,
            message_ids: message_ids(&wire.id),
            raw,
        })
    }

    pub fn into_result(self) -> Result<DispatchReceipt, ReminderError> {
        match self {
            Self::Accepted(receipt) => Ok(receipt),
            Self::Rejected(reason) => Err(ReminderError::GatewayRejected(reason)),
            Self::Malformed(body) => Err(ReminderError::GatewayRequest(format!(
                "malformed gateway response: {}",
                truncate(&body, 200)
            ))),
        }
    }
}

/// Map an HTTP status plus body onto the dispatcher's error contract.
pub fn interpret(status: u16, body: &str) -> Result<DispatchReceipt, ReminderError> {
    if !(200..300).contains(&status) {
        let why = match GatewayReply::decode(body) {
            GatewayReply::Rejected(reason) => reason,
            _ => truncate(body, 200),
        };
        return Err(ReminderError::GatewayRequest(format!("HTTP {status}: {why}")));
    }
    GatewayReply::decode(body).into_result()
}

// Fonnte returns ids as strings or numbers, singly or in an array.
fn message_ids(id: &Value) -> Vec<String> {
    let one = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    match id {
        Value::Array(items) => items.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_reply_keeps_ids_and_detail() {
        let body = r#"{"status":true,"detail":"success! message in queue","id":["80367170"],"process":"pending"}"#;
        match GatewayReply::decode(body) {
            GatewayReply::Accepted(r) => {
                assert_eq!(r.detail.as_deref(), Some("success! message in queue"));
                assert_eq!(r.message_ids, vec!["80367170".to_string()]);
                assert_eq!(r.raw["process"], "pending");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numeric_id_is_accepted() {
        let r = interpret(200, r#"{"status":true,"id":12}"#).unwrap();
        assert_eq!(r.message_ids, vec!["12".to_string()]);
    }

    #[test]
    fn status_false_preserves_reason() {
        let err = interpret(200, r#"{"status":false,"reason":"quota exceeded"}"#).unwrap_err();
        assert_eq!(err, ReminderError::GatewayRejected("quota exceeded".into()));
    }

    #[test]
    fn status_false_without_reason_gets_default() {
        assert_eq!(
            GatewayReply::decode(r#"{"status":false}"#),
            GatewayReply::Rejected("Failed to send WhatsApp".into())
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(GatewayReply::decode("<html>502</html>"), GatewayReply::Malformed(_)));
        assert!(matches!(GatewayReply::decode(r#"{"ok":1}"#), GatewayReply::Malformed(_)));
        let err = interpret(200, "not json").unwrap_err();
        assert!(matches!(err, ReminderError::GatewayRequest(m) if m.contains("malformed")));
    }

    #[test]
    fn http_error_is_request_error() {
        let err = interpret(401, r#"{"status":false,"reason":"invalid token"}"#).unwrap_err();
        assert_eq!(err, ReminderError::GatewayRequest("HTTP 401: invalid token".into()));

        let err = interpret(503, "upstream down").unwrap_err();
        assert_eq!(err, ReminderError::GatewayRequest("HTTP 503: upstream down".into()));
    }
}
