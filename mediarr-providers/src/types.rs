//! Shared provider result types

use std::collections::HashMap;

use serde::Serialize;

/// Outcome of probing a configured provider instance.
///
/// Always a value, never an error: `test_connection` entry points convert
/// every failure into `{ connected: false, error }`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionTestResult {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResult {
    #[must_use]
    pub fn connected(version: Option<String>, details: HashMap<String, String>) -> Self {
        Self {
            connected: true,
            version: version.filter(|v| !v.is_empty()),
            details: (!details.is_empty()).then_some(details),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            version: None,
            details: None,
            error: Some(error.into()),
        }
    }
}
