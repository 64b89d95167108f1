//! Provider instance registry
//!
//! Holds the live client for every configured provider instance, keyed by
//! instance id. Clients are built here from persisted connection configs so
//! route handlers never construct them ad hoc; construction failures
//! surface immediately (fail-fast validation in the client constructors).

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use mediarr_providers::arr::{ProwlarrClient, RadarrClient, SonarrClient};
use mediarr_providers::torrent::{QbittorrentClient, TransmissionClient};
use mediarr_providers::{
    ArrClient, ClassifiedError, ConnectionTestResult, ErrorKind, ProviderConnectionConfig,
    TorrentClient,
};

/// Provider kinds the registry can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Sonarr,
    Radarr,
    Prowlarr,
    Qbittorrent,
    Transmission,
}

/// A live client, by family.
#[derive(Clone)]
pub enum ProviderInstance {
    Arr(Arc<dyn ArrClient>),
    Torrent(Arc<dyn TorrentClient>),
}

impl ProviderInstance {
    async fn test_connection(&self) -> ConnectionTestResult {
        match self {
            Self::Arr(client) => client.test_connection().await,
            Self::Torrent(client) => client.test_connection().await,
        }
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    instances: DashMap<String, ProviderInstance>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a client for one configured instance.
    pub fn create_instance(
        &self,
        kind: ProviderKind,
        instance_id: &str,
        config: ProviderConnectionConfig,
    ) -> Result<(), ClassifiedError> {
        if self.instances.contains_key(instance_id) {
            return Err(ClassifiedError::new(
                ErrorKind::Conflict,
                "A provider instance with this id is already registered.",
            ));
        }
        let instance = match kind {
            ProviderKind::Sonarr => ProviderInstance::Arr(Arc::new(SonarrClient::new(config)?)),
            ProviderKind::Radarr => ProviderInstance::Arr(Arc::new(RadarrClient::new(config)?)),
            ProviderKind::Prowlarr => {
                ProviderInstance::Arr(Arc::new(ProwlarrClient::new(config)?))
            }
            ProviderKind::Qbittorrent => {
                ProviderInstance::Torrent(Arc::new(QbittorrentClient::new(config)?))
            }
            ProviderKind::Transmission => {
                ProviderInstance::Torrent(Arc::new(TransmissionClient::new(config)?))
            }
        };
        self.instances.insert(instance_id.to_string(), instance);
        tracing::debug!(instance_id, ?kind, "provider instance registered");
        Ok(())
    }

    /// The Arr client for an instance id, if it is one.
    #[must_use]
    pub fn arr(&self, instance_id: &str) -> Option<Arc<dyn ArrClient>> {
        match self.instances.get(instance_id)?.value() {
            ProviderInstance::Arr(client) => Some(Arc::clone(client)),
            ProviderInstance::Torrent(_) => None,
        }
    }

    /// The download client for an instance id, if it is one.
    #[must_use]
    pub fn torrent(&self, instance_id: &str) -> Option<Arc<dyn TorrentClient>> {
        match self.instances.get(instance_id)?.value() {
            ProviderInstance::Torrent(client) => Some(Arc::clone(client)),
            ProviderInstance::Arr(_) => None,
        }
    }

    pub fn remove_instance(&self, instance_id: &str) -> bool {
        self.instances.remove(instance_id).is_some()
    }

    #[must_use]
    pub fn instance_ids(&self) -> Vec<String> {
        self.instances.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Probe every registered instance concurrently, tolerating partial
    /// failure: each result is a value, never an error.
    pub async fn test_all(&self) -> Vec<(String, ConnectionTestResult)> {
        let targets: Vec<(String, ProviderInstance)> = self
            .instances
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        join_all(targets.into_iter().map(|(id, instance)| async move {
            let result = instance.test_connection().await;
            (id, result)
        }))
        .await
    }
}
