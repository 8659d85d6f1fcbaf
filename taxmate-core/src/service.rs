//! Error values returned across the import/confirm network boundary

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A remote failure, carried as a value rather than raised.
///
/// Matches the backend's `{error, details?}` body so it can be shown verbatim.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct ServiceError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Interpret an error response body.
    ///
    /// Bodies that are not `{error, ...}` are kept whole under `details`.
    pub fn from_body(status: u16, body: &str) -> Self {
        if let Ok(err) = serde_json::from_str::<ServiceError>(body) {
            return err;
        }
        let fallback = ServiceError::new(format!("HTTP {status}"));
        match serde_json::from_str::<Value>(body) {
            Ok(v) => fallback.with_details(v),
            Err(_) if body.trim().is_empty() => fallback,
            Err(_) => fallback.with_details(Value::String(body.trim().to_string())),
        }
    }
}
