use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Shown when an error payload carries no field we know how to display.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Which form an error is reported against. Selects the payload fields worth showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    User,
    Contact,
    General,
}

impl ErrorContext {
    fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::User => &["email", "username", "phone"],
            Self::Contact => &["email", "name", "phone"],
            Self::General => &[],
        }
    }
}

/// Field name to messages, as returned by the backend's validators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Reads every top-level key of a JSON object. Strings become one message,
    /// arrays keep their string entries, other values are kept as JSON text.
    pub fn from_payload(payload: &Value) -> Self {
        let mut fields = BTreeMap::new();
        if let Value::Object(map) = payload {
            for (key, value) in map {
                let messages = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    Value::Null => continue,
                    other => vec![other.to_string()],
                };
                if !messages.is_empty() {
                    fields.insert(key.clone(), messages);
                }
            }
        }
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|m| m.first()).map(String::as_str)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First message of each field relevant to `context`, then `non_field_errors` and `detail`.
    pub fn messages_for(&self, context: ErrorContext) -> Vec<String> {
        context
            .fields()
            .iter()
            .chain(["non_field_errors", "detail"].iter())
            .filter_map(|field| self.first(field))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("not logged in")]
    Unauthenticated,

    #[error("authentication rejected{}", .detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Auth { detail: Option<String> },

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("server returned {status}")]
    Status { status: StatusCode, fields: FieldErrors },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Classifies a non-2xx response. `payload` is `{}` when the body was not JSON.
    pub fn from_response(status: StatusCode, payload: &Value) -> Self {
        let fields = FieldErrors::from_payload(payload);
        match status {
            StatusCode::UNAUTHORIZED => Self::Auth {
                detail: fields.first("detail").map(str::to_string),
            },
            StatusCode::BAD_REQUEST if !fields.is_empty() => Self::Validation(fields),
            _ => Self::Status { status, fields },
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Unauthenticated)
    }

    /// Lines for the shared error panel.
    pub fn user_messages(&self, context: ErrorContext) -> Vec<String> {
        let extracted = match self {
            Self::Validation(fields) | Self::Status { fields, .. } => fields.messages_for(context),
            Self::Auth { detail } => detail.iter().cloned().collect(),
            Self::Unauthenticated => return vec![self.to_string()],
            Self::Network(_) | Self::Decode(_) => Vec::new(),
        };
        if extracted.is_empty() {
            return vec![FALLBACK_MESSAGE.to_string()];
        }
        extracted.into_iter().map(|m| format!("*{}", m)).collect()
    }
}
