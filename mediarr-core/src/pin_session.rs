//! Plex PIN pairing session manager
//!
//! One session per pairing attempt, keyed by a generated client
//! identifier. Three call paths share the store concurrently: `initiate`
//! creates sessions, `poll` advances them, and a periodic sweeper deletes
//! the ones nobody polls anymore. Sessions are single-use and die on the
//! first of: successful authentication, explicit cancel, attempt cap, or
//! absolute TTL.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use mediarr_providers::plex::{PlexClient, PlexUser};
use mediarr_providers::{ClassifiedError, ErrorKind};

use crate::config::PinAuthConfig;

#[derive(Debug, Error)]
pub enum PinAuthError {
    /// Unknown key, wrong PIN id, or a session already consumed/swept
    #[error("Authentication session is invalid or has expired. Please restart the sign-in process.")]
    SessionInvalid,

    #[error("Authentication session has expired. Please restart the sign-in process.")]
    Expired,

    #[error("Too many authentication attempts. Please restart the sign-in process.")]
    AttemptsExceeded,

    #[error(transparent)]
    Provider(#[from] ClassifiedError),
}

/// Live pairing session. Mutated only by `poll` (attempts, last check) and
/// deleted by whichever terminal path gets there first.
#[derive(Clone)]
pub struct PinAuthSession {
    pub pin_id: i64,
    pub pin_code: String,
    pub client_identifier: String,
    pub created_at: Instant,
    pub last_checked_at: Option<Instant>,
    pub attempts: u32,
    /// Ephemeral provider client scoped to this session; plex.tv requires
    /// the same client identifier for issue and poll.
    client: Arc<PlexClient>,
}

/// Payload returned when a pairing handshake starts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinAuthStart {
    pub pin_id: i64,
    pub pin_code: String,
    pub qr_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub client_identifier: String,
}

/// Poll outcome. `token`/`user` are set only when `authenticated` is true.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinAuthPoll {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PlexUser>,
}

impl PinAuthPoll {
    fn pending() -> Self {
        Self::default()
    }
}

pub struct PinSessionManager {
    config: PinAuthConfig,
    sessions: Arc<DashMap<String, PinAuthSession>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl PinSessionManager {
    #[must_use]
    pub fn new(config: PinAuthConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(DashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Start a pairing handshake: ask plex.tv for a PIN and create the
    /// session under a fresh client identifier.
    pub async fn initiate(&self) -> Result<PinAuthStart, PinAuthError> {
        let client_identifier = Uuid::new_v4().to_string();
        let client = Arc::new(PlexClient::with_base_url(
            &self.config.plex_base_url,
            &client_identifier,
        ));

        let pin = client.create_pin().await?;
        let qr_url = client.qr_link_url(&pin.code);

        let session = PinAuthSession {
            pin_id: pin.id,
            pin_code: pin.code.clone(),
            client_identifier: client_identifier.clone(),
            created_at: Instant::now(),
            last_checked_at: None,
            attempts: 0,
            client,
        };
        self.sessions.insert(client_identifier.clone(), session);

        tracing::debug!(pin_id = pin.id, %client_identifier, "pin pairing session created");
        Ok(PinAuthStart {
            pin_id: pin.id,
            pin_code: pin.code,
            qr_url,
            expires_at: pin.expires_at,
            client_identifier,
        })
    }

    /// Advance a pairing session. Provider failures are reported as a
    /// pending result, never propagated raw; session lifecycle outcomes are
    /// typed errors.
    pub async fn poll(
        &self,
        client_identifier: &str,
        pin_id: i64,
    ) -> Result<PinAuthPoll, PinAuthError> {
        // bump bookkeeping under the shard lock; nothing is awaited while
        // the guard is held
        let (client, attempts, age) = {
            let mut entry = self
                .sessions
                .get_mut(client_identifier)
                .ok_or(PinAuthError::SessionInvalid)?;
            if entry.pin_id != pin_id {
                return Err(PinAuthError::SessionInvalid);
            }
            entry.attempts += 1;
            entry.last_checked_at = Some(Instant::now());
            (
                Arc::clone(&entry.client),
                entry.attempts,
                entry.created_at.elapsed(),
            )
        };

        if attempts > self.config.max_attempts {
            self.sessions.remove(client_identifier);
            tracing::debug!(%client_identifier, attempts, "pin session exceeded attempt cap");
            return Err(PinAuthError::AttemptsExceeded);
        }
        if age > self.config.session_ttl() {
            self.sessions.remove(client_identifier);
            tracing::debug!(%client_identifier, "pin session exceeded ttl");
            return Err(PinAuthError::Expired);
        }

        let pin = match client.check_pin(pin_id).await {
            Ok(pin) => pin,
            // the PIN is gone upstream; the session cannot ever succeed
            Err(err) if err.kind == ErrorKind::NotFound => {
                self.sessions.remove(client_identifier);
                return Err(PinAuthError::Expired);
            }
            Err(err) => {
                tracing::debug!(%client_identifier, error = %err, "pin status check failed");
                return Ok(PinAuthPoll::pending());
            }
        };

        let Some(token) = pin.granted_token().map(ToString::to_string) else {
            return Ok(PinAuthPoll::pending());
        };

        let user = match client.user(&token).await {
            Ok(user) => user,
            // keep the session; the next poll retries the whole handshake
            Err(err) => {
                tracing::debug!(%client_identifier, error = %err, "profile fetch failed");
                return Ok(PinAuthPoll::pending());
            }
        };

        // the removal is the commit point: if the sweeper deleted the
        // session while we awaited the provider, it already expired
        if self.sessions.remove(client_identifier).is_none() {
            return Err(PinAuthError::Expired);
        }
        tracing::info!(%client_identifier, username = %user.username, "pin pairing authenticated");
        Ok(PinAuthPoll {
            authenticated: true,
            token: Some(token),
            user: Some(user),
        })
    }

    /// Delete a session regardless of state. Idempotent.
    pub fn cancel(&self, client_identifier: &str) -> bool {
        let removed = self.sessions.remove(client_identifier).is_some();
        if removed {
            tracing::debug!(%client_identifier, "pin session cancelled");
        }
        removed
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Start the background sweep that deletes sessions past the TTL even
    /// when nobody polls them. No-op if already running.
    pub fn start_sweeper(&self) {
        let mut guard = self.sweeper.lock();
        if guard.is_some() {
            return;
        }
        let sessions = Arc::clone(&self.sessions);
        let ttl = self.config.session_ttl();
        let period = self.config.sweep_interval();
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let before = sessions.len();
                sessions.retain(|_, session| session.created_at.elapsed() <= ttl);
                let swept = before.saturating_sub(sessions.len());
                if swept > 0 {
                    tracing::debug!(swept, "expired pin sessions removed");
                }
            }
        }));
    }

    /// Stop the background sweep. Idempotent.
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for PinSessionManager {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_missing_session_is_false() {
        let manager = PinSessionManager::new(PinAuthConfig::default());
        assert!(!manager.cancel("nope"));
    }

    #[tokio::test]
    async fn test_poll_unknown_session_is_invalid() {
        let manager = PinSessionManager::new(PinAuthConfig::default());
        let err = manager.poll("nope", 1).await.unwrap_err();
        assert!(matches!(err, PinAuthError::SessionInvalid));
    }

    #[tokio::test]
    async fn test_sweeper_start_is_idempotent_and_stoppable() {
        let manager = PinSessionManager::new(PinAuthConfig::default());
        manager.start_sweeper();
        manager.start_sweeper();
        assert!(manager.sweeper.lock().is_some());
        manager.stop_sweeper();
        assert!(manager.sweeper.lock().is_none());
        manager.stop_sweeper();
    }
}
