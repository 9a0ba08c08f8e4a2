//! Phone normalization for the WhatsApp gateway (Indonesian numbers).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReminderError;

/// Indonesia's country calling code; prepended to every dispatched number.
pub const COUNTRY_CODE: &str = "62";

/// Digits only, country code stripped (e.g. `81234567890`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPhone(String);

impl NormalizedPhone {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Gateway-facing form: `62` followed by the local digits.
    pub fn dispatch_form(&self) -> String {
        format!("{COUNTRY_CODE}{}", self.0)
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a user-entered phone number.
///
/// Keeps ASCII digits (and a `+` only in first position), then applies the
/// first matching rewrite: leading `0`, `+62`, `62`. A number already in bare
/// local form is left as-is.
///
/// Fails with [`ReminderError::InvalidPhone`] when no digits remain, either
/// after stripping or after the rewrite: `"0"`, `"+62"` and `"62"` carry no
/// subscriber number and would otherwise dispatch to the bare country code.
pub fn normalize(raw: &str) -> Result<NormalizedPhone, ReminderError> {
    let mut stripped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() || (c == '+' && stripped.is_empty()) {
            stripped.push(c);
        }
    }

    let rewritten = if let Some(rest) = stripped.strip_prefix('0') {
        rest
    } else if let Some(rest) = stripped.strip_prefix("+62") {
        rest
    } else if let Some(rest) = stripped.strip_prefix(COUNTRY_CODE) {
        rest
    } else {
        stripped.as_str()
    };

    // Foreign "+1..." style input keeps its digits but not the plus.
    let digits: String = rewritten.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ReminderError::InvalidPhone(raw.to_string()));
    }

    Ok(NormalizedPhone(digits))
}

/// Shorthand for `normalize(raw)?.dispatch_form()`.
pub fn to_dispatch_form(raw: &str) -> Result<String, ReminderError> {
    Ok(normalize(raw)?.dispatch_form())
}
