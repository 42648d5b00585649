//! Broadcast recipients.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// A single recipient as supplied by the caller (e.g. a row of an uploaded sheet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Raw phone as typed by the operator; normalized at send time.
    #[serde(default, deserialize_with = "phone_from_any")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Contact {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name used for `{{name}}` substitution; empty when the contact has none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn normalized_phone(&self) -> DomainResult<String> {
        normalize_phone(&self.phone)
    }
}

/// Accepts strings, numbers and null; any other JSON becomes empty and fails
/// normalization at send time.
fn phone_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Strip everything but digits and a leading `+`.
///
/// A `+` is kept only when it precedes every digit. Input without a single
/// digit is rejected with [`DomainError::InvalidPhone`].
pub fn normalize_phone(raw: &str) -> DomainResult<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' && out.is_empty() {
            out.push(c);
        }
    }

    if !out.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::InvalidPhone);
    }
    Ok(out)
}
