//! Canonical torrent lifecycle states
//!
//! Each download-client backend speaks its own status vocabulary; this
//! module maps every native token into one closed, backend-agnostic
//! enumeration. The mapping is total: tokens the table does not know
//! resolve to `Unknown`, which callers must treat as a legitimate,
//! displayable state rather than an error.

use serde::{Deserialize, Serialize};

/// Backend-agnostic download lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalTorrentState {
    Allocating,
    Downloading,
    MetadataDownload,
    Queued,
    Stalled,
    Checking,
    Seeding,
    Paused,
    Error,
    MissingFiles,
    Moving,
    Unknown,
}

/// Supported download-client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TorrentBackend {
    Qbittorrent,
    Transmission,
}

/// Map a backend's native status token to the canonical state.
/// Case-insensitive on the token; unmapped tokens yield `Unknown`.
#[must_use]
pub fn normalize(backend: TorrentBackend, native: &str) -> CanonicalTorrentState {
    let token = native.trim().to_ascii_lowercase();
    match backend {
        TorrentBackend::Qbittorrent => normalize_qbittorrent(&token),
        TorrentBackend::Transmission => normalize_transmission(&token),
    }
}

fn normalize_qbittorrent(token: &str) -> CanonicalTorrentState {
    use CanonicalTorrentState::*;
    match token {
        "allocating" => Allocating,
        "downloading" | "forceddl" => Downloading,
        "metadl" | "forcedmetadl" => MetadataDownload,
        "queueddl" | "queuedup" => Queued,
        "stalleddl" => Stalled,
        // stalledUP is a seed state with no peers, not a stalled download
        "uploading" | "forcedup" | "stalledup" => Seeding,
        "pauseddl" | "pausedup" | "stoppeddl" | "stoppedup" => Paused,
        "checkingdl" | "checkingup" | "checkingresumedata" => Checking,
        "error" => Error,
        "missingfiles" => MissingFiles,
        "moving" => Moving,
        _ => Unknown,
    }
}

// Transmission reports a numeric status plus error/isStalled flags; the
// client renders those to these tokens before lookup.
fn normalize_transmission(token: &str) -> CanonicalTorrentState {
    use CanonicalTorrentState::*;
    match token {
        "stopped" => Paused,
        "check-waiting" | "checking" => Checking,
        "download-waiting" | "seed-waiting" => Queued,
        "downloading" => Downloading,
        "stalled" => Stalled,
        "seeding" => Seeding,
        "error" => Error,
        _ => Unknown,
    }
}

impl CanonicalTorrentState {
    #[must_use]
    pub const fn is_downloading(self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::MetadataDownload | Self::Allocating
        )
    }

    #[must_use]
    pub const fn is_seeding(self) -> bool {
        matches!(self, Self::Seeding)
    }

    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    #[must_use]
    pub const fn is_errored(self) -> bool {
        matches!(self, Self::Error | Self::MissingFiles)
    }
}
