//! Download-client backends
//!
//! Backends differ in authentication strategy (qBittorrent holds a session
//! cookie, Transmission replays a CSRF header) and in status vocabulary;
//! the `TorrentClient` trait plus the state normalizer hide both. Callers
//! only ever see `CanonicalTorrent` records.

pub mod qbittorrent;
pub mod state;
pub mod transmission;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifiedError;
use crate::types::ConnectionTestResult;

pub use qbittorrent::QbittorrentClient;
pub use state::{normalize, CanonicalTorrentState, TorrentBackend};
pub use transmission::TransmissionClient;

/// A torrent in backend-agnostic form. `native_state` is retained for
/// diagnostics; `state` is what callers switch on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTorrent {
    pub hash: String,
    pub name: String,
    pub state: CanonicalTorrentState,
    pub native_state: String,
    /// Completion in the range 0.0..=1.0
    pub progress: f64,
    pub size_bytes: i64,
    pub downloaded_bytes: i64,
    pub uploaded_bytes: i64,
    /// Bytes per second
    pub download_rate: i64,
    pub upload_rate: i64,
    pub eta_seconds: Option<i64>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub save_path: Option<String>,
    /// Unix timestamp
    pub added_on: Option<i64>,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TorrentSort {
    Name,
    Progress,
    AddedOn,
    DownloadRate,
}

/// Listing filter, expressed in canonical vocabulary only.
#[derive(Debug, Clone, Default)]
pub struct TorrentFilter {
    pub states: Vec<CanonicalTorrentState>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub hashes: Vec<String>,
    pub sort: Option<TorrentSort>,
}

impl TorrentFilter {
    /// Apply the canonical-state/sort part of the filter. Backends push
    /// category/hash filtering to the server where the API supports it and
    /// call this on the normalized result.
    pub(crate) fn apply(&self, torrents: &mut Vec<CanonicalTorrent>) {
        if !self.states.is_empty() {
            torrents.retain(|t| self.states.contains(&t.state));
        }
        if let Some(category) = &self.category {
            torrents.retain(|t| t.category.as_deref() == Some(category.as_str()));
        }
        if let Some(tag) = &self.tag {
            torrents.retain(|t| t.tags.iter().any(|candidate| candidate == tag));
        }
        if !self.hashes.is_empty() {
            torrents.retain(|t| {
                self.hashes
                    .iter()
                    .any(|hash| hash.eq_ignore_ascii_case(&t.hash))
            });
        }
        match self.sort {
            Some(TorrentSort::Name) => {
                torrents.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            }
            Some(TorrentSort::Progress) => {
                torrents.sort_by(|a, b| {
                    b.progress
                        .partial_cmp(&a.progress)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            Some(TorrentSort::AddedOn) => {
                torrents.sort_by(|a, b| b.added_on.cmp(&a.added_on));
            }
            Some(TorrentSort::DownloadRate) => {
                torrents.sort_by(|a, b| b.download_rate.cmp(&a.download_rate));
            }
            None => {}
        }
    }
}

/// Queue-priority moves shared by both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TorrentPriority {
    Top,
    Up,
    Down,
    Bottom,
}

/// Options for adding a torrent by magnet or `.torrent` URL.
#[derive(Debug, Clone, Default)]
pub struct AddTorrentOptions {
    pub urls: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub save_path: Option<String>,
    pub paused: bool,
}

/// Contract shared by every download-client backend.
///
/// Mutating operations are one-way fire calls: success or a classified
/// failure, no parsed payload. Listings are normalized before return.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    fn backend(&self) -> TorrentBackend;

    /// Probe the instance. Never fails; always returns a value.
    async fn test_connection(&self) -> ConnectionTestResult;

    async fn get_torrents(
        &self,
        filter: &TorrentFilter,
    ) -> Result<Vec<CanonicalTorrent>, ClassifiedError>;

    async fn add_torrent(&self, options: &AddTorrentOptions) -> Result<(), ClassifiedError>;

    async fn delete_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), ClassifiedError>;

    async fn pause_torrent(&self, hash: &str) -> Result<(), ClassifiedError>;

    async fn resume_torrent(&self, hash: &str) -> Result<(), ClassifiedError>;

    async fn recheck_torrent(&self, hash: &str) -> Result<(), ClassifiedError>;

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), ClassifiedError>;

    async fn set_priority(
        &self,
        hash: &str,
        priority: TorrentPriority,
    ) -> Result<(), ClassifiedError>;

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), ClassifiedError>;
}
