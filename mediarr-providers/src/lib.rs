// Mediarr Provider Clients
//
// Pure HTTP clients for the third-party services a media-management
// application integrates with, plus the resilience and error boundary they
// all share:
//
// - arr:     Sonarr / Radarr / Prowlarr (shared system surface + API key)
// - torrent: qBittorrent / Transmission (incompatible auth + state vocab)
// - plex:    plex.tv device-pairing PIN flow
//
// Every outbound call runs through the backoff executor in `resilience`,
// and every failure is classified in `error` before leaving this crate.
// Clients are independent of the registry/session layers in mediarr-core
// and can be used standalone.

// Shared error boundary and retry layer
pub mod config;
pub mod error;
pub mod resilience;
pub mod types;

// Provider families
pub mod arr;
pub mod plex;
pub mod torrent;

// Re-export the types callers touch on every operation
pub use config::{Credential, ProviderConnectionConfig};
pub use error::{ClassifiedError, ErrorKind};
pub use resilience::RetryPolicy;
pub use types::ConnectionTestResult;

pub use arr::{ArrClient, ProwlarrClient, RadarrClient, SonarrClient};
pub use plex::PlexClient;
pub use torrent::{
    CanonicalTorrent, CanonicalTorrentState, QbittorrentClient, TorrentBackend, TorrentClient,
    TorrentFilter, TorrentPriority, TransmissionClient,
};
