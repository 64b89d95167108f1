//! plex.tv response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device-pairing PIN. `auth_token` stays empty until the user approves
/// the code on another device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinResponse {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PinResponse {
    /// The granted token, once the PIN has been approved.
    #[must_use]
    pub fn granted_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexUser {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub thumb: String,
}
