//! Per-instance provider connection configuration
//!
//! Supplied by the persistence layer, validated here before any client is
//! constructed. Validation is a deliberate fail-fast boundary: a
//! misconfigured instance never reaches the network layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifiedError, ErrorKind};
use crate::resilience::{timeout, RetryPolicy};

/// Minimum plausible API key length; Arr applications issue 32-char keys.
pub const MIN_API_KEY_LEN: usize = 8;

/// Credential for a provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    ApiKey { api_key: String },
    UsernamePassword { username: String, password: String },
}

impl Credential {
    #[must_use]
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self::ApiKey {
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Connection settings for one configured provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConnectionConfig {
    /// Normalized base URL; trailing slashes are stripped on construction.
    pub base_url: String,
    pub credential: Credential,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout() -> Duration {
    timeout::HTTP_REQUEST_TIMEOUT
}

impl ProviderConnectionConfig {
    /// Build and validate a connection config. Fails fast on an empty or
    /// non-http(s) base URL or a malformed credential.
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
    ) -> Result<Self, ClassifiedError> {
        let config = Self {
            base_url: normalize_base_url(base_url.into()),
            credential,
            timeout: default_timeout(),
            retry: RetryPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), ClassifiedError> {
        if self.base_url.is_empty() {
            return Err(invalid_config("Base URL must not be empty."));
        }
        match url::Url::parse(&self.base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(invalid_config("Base URL must be a valid http(s) URL.")),
        }
        match &self.credential {
            Credential::ApiKey { api_key } => {
                if api_key.trim().len() < MIN_API_KEY_LEN {
                    return Err(invalid_config(
                        "API key is too short to be valid. Please check your credentials.",
                    ));
                }
            }
            Credential::UsernamePassword { username, .. } => {
                if username.trim().is_empty() {
                    return Err(invalid_config("Username must not be empty."));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        match &self.credential {
            Credential::ApiKey { api_key } => Some(api_key),
            Credential::UsernamePassword { .. } => None,
        }
    }

    #[must_use]
    pub fn username_password(&self) -> Option<(&str, &str)> {
        match &self.credential {
            Credential::UsernamePassword { username, password } => {
                Some((username.as_str(), password.as_str()))
            }
            Credential::ApiKey { .. } => None,
        }
    }
}

fn invalid_config(message: &str) -> ClassifiedError {
    ClassifiedError::new(ErrorKind::Unknown, message)
}

fn normalize_base_url(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
