//! Transmission RPC client
//!
//! Transmission has no login exchange: requests carry optional HTTP basic
//! auth plus the `X-Transmission-Session-Id` CSRF header. A 409 response
//! carries a fresh session id that must be replayed; the request is retried
//! once with it.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    normalize, AddTorrentOptions, CanonicalTorrent, TorrentBackend, TorrentClient, TorrentFilter,
    TorrentPriority,
};
use crate::config::ProviderConnectionConfig;
use crate::error::{check_response, json_with_limit, ClassifiedError, ErrorKind};
use crate::resilience::{execute, timeout};
use crate::types::ConnectionTestResult;

const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .timeout(timeout::HTTP_REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build Transmission shared HTTP client")
});

pub struct TransmissionClient {
    config: ProviderConnectionConfig,
    client: Client,
    session_id: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: String,
    arguments: Option<T>,
}

impl TransmissionClient {
    pub fn new(config: ProviderConnectionConfig) -> Result<Self, ClassifiedError> {
        config.validate()?;
        if config.username_password().is_none() {
            return Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "Transmission requires a username/password credential.",
            ));
        }
        Ok(Self {
            config,
            client: SHARED_CLIENT.clone(),
            session_id: RwLock::new(None),
        })
    }

    fn rpc_url(&self) -> String {
        format!("{}/transmission/rpc", self.config.base_url)
    }

    fn request(&self, body: &Value, session_id: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(self.rpc_url())
            .json(body)
            .timeout(self.config.timeout);
        if let Some((username, password)) = self.config.username_password() {
            req = req.basic_auth(username, Some(password));
        }
        if let Some(session_id) = session_id {
            req = req.header(SESSION_ID_HEADER, session_id);
        }
        req
    }

    async fn rpc_once<T: DeserializeOwned>(
        &self,
        method: &str,
        arguments: &Value,
    ) -> Result<T, ClassifiedError> {
        let body = json!({ "method": method, "arguments": arguments });
        let session_id = self.session_id.read().clone();
        let resp = self.request(&body, session_id.as_deref()).send().await?;

        let resp = if resp.status() == StatusCode::CONFLICT {
            // the CSRF handshake: replay with the session id from the 409
            let fresh = resp
                .headers()
                .get(SESSION_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string)
                .ok_or_else(|| {
                    ClassifiedError::new(
                        ErrorKind::Unknown,
                        "The download client did not provide a session id.",
                    )
                })?;
            tracing::debug!(base_url = %self.config.base_url, "transmission session id refreshed");
            *self.session_id.write() = Some(fresh.clone());
            self.request(&body, Some(&fresh)).send().await?
        } else {
            resp
        };

        let envelope: RpcEnvelope<T> = json_with_limit(check_response(resp)?).await?;
        if envelope.result != "success" {
            return Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "The download client rejected the request.",
            )
            .with_cause(envelope.result.into()));
        }
        envelope.arguments.ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                "Received an invalid response from the service.",
            )
        })
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        arguments: Value,
    ) -> Result<T, ClassifiedError> {
        execute(
            || async { self.rpc_once(method, &arguments).await },
            &self.config.retry,
        )
        .await
    }

    /// Fire an RPC method, discarding whatever arguments come back.
    async fn rpc_fire(&self, method: &str, arguments: Value) -> Result<(), ClassifiedError> {
        let _: Value = self.rpc(method, arguments).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionTorrent {
    hash_string: String,
    name: String,
    status: i64,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    is_stalled: bool,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    downloaded_ever: i64,
    #[serde(default)]
    uploaded_ever: i64,
    #[serde(default)]
    rate_download: i64,
    #[serde(default)]
    rate_upload: i64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    download_dir: String,
    #[serde(default)]
    added_date: i64,
    #[serde(default)]
    upload_ratio: f64,
}

const TORRENT_FIELDS: [&str; 16] = [
    "hashString",
    "name",
    "status",
    "error",
    "isStalled",
    "percentDone",
    "totalSize",
    "downloadedEver",
    "uploadedEver",
    "rateDownload",
    "rateUpload",
    "eta",
    "labels",
    "downloadDir",
    "addedDate",
    "uploadRatio",
];

impl TransmissionTorrent {
    /// Render the numeric status plus error/stall flags to the native
    /// token the state table is keyed on.
    fn native_state(&self) -> &'static str {
        if self.error != 0 {
            return "error";
        }
        if self.is_stalled && self.status == 4 {
            return "stalled";
        }
        match self.status {
            0 => "stopped",
            1 => "check-waiting",
            2 => "checking",
            3 => "download-waiting",
            4 => "downloading",
            5 => "seed-waiting",
            6 => "seeding",
            _ => "unknown",
        }
    }

    fn into_canonical(self) -> CanonicalTorrent {
        let native = self.native_state();
        CanonicalTorrent {
            state: normalize(TorrentBackend::Transmission, native),
            native_state: native.to_string(),
            hash: self.hash_string,
            name: self.name,
            progress: self.percent_done,
            size_bytes: self.total_size,
            downloaded_bytes: self.downloaded_ever,
            uploaded_bytes: self.uploaded_ever,
            download_rate: self.rate_download,
            upload_rate: self.rate_upload,
            eta_seconds: (self.eta > 0).then_some(self.eta),
            category: self.labels.first().cloned(),
            tags: self.labels,
            save_path: (!self.download_dir.is_empty()).then_some(self.download_dir),
            added_on: (self.added_date > 0).then_some(self.added_date),
            ratio: self.upload_ratio,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TorrentGetArgs {
    #[serde(default)]
    torrents: Vec<TransmissionTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SessionGetArgs {
    #[serde(default)]
    version: String,
    #[serde(default)]
    rpc_version: i64,
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn backend(&self) -> TorrentBackend {
        TorrentBackend::Transmission
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        match self.rpc::<SessionGetArgs>("session-get", json!({})).await {
            Ok(session) => {
                let mut details = HashMap::new();
                details.insert("backend".to_string(), "transmission".to_string());
                if session.rpc_version > 0 {
                    details.insert("rpcVersion".to_string(), session.rpc_version.to_string());
                }
                ConnectionTestResult::connected(Some(session.version), details)
            }
            Err(err) => {
                tracing::warn!(
                    base_url = %self.config.base_url,
                    error = %err,
                    "connection test failed"
                );
                ConnectionTestResult::failed(err.to_string())
            }
        }
    }

    async fn get_torrents(
        &self,
        filter: &TorrentFilter,
    ) -> Result<Vec<CanonicalTorrent>, ClassifiedError> {
        // the RPC has no server-side filters; everything is applied after
        // normalization
        let args: TorrentGetArgs = self
            .rpc("torrent-get", json!({ "fields": TORRENT_FIELDS }))
            .await?;
        let mut torrents: Vec<CanonicalTorrent> = args
            .torrents
            .into_iter()
            .map(TransmissionTorrent::into_canonical)
            .collect();
        filter.apply(&mut torrents);
        Ok(torrents)
    }

    async fn add_torrent(&self, options: &AddTorrentOptions) -> Result<(), ClassifiedError> {
        for url in &options.urls {
            let mut arguments = json!({ "filename": url, "paused": options.paused });
            if let Some(save_path) = &options.save_path {
                arguments["download-dir"] = json!(save_path);
            }
            let mut labels = options.tags.clone();
            if let Some(category) = &options.category {
                labels.insert(0, category.clone());
            }
            if !labels.is_empty() {
                arguments["labels"] = json!(labels);
            }
            self.rpc_fire("torrent-add", arguments).await?;
        }
        Ok(())
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), ClassifiedError> {
        self.rpc_fire(
            "torrent-remove",
            json!({ "ids": [hash], "delete-local-data": delete_files }),
        )
        .await
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.rpc_fire("torrent-stop", json!({ "ids": [hash] })).await
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.rpc_fire("torrent-start", json!({ "ids": [hash] })).await
    }

    async fn recheck_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.rpc_fire("torrent-verify", json!({ "ids": [hash] })).await
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), ClassifiedError> {
        // Transmission models categories as labels
        self.rpc_fire(
            "torrent-set",
            json!({ "ids": [hash], "labels": [category] }),
        )
        .await
    }

    async fn set_priority(
        &self,
        hash: &str,
        priority: TorrentPriority,
    ) -> Result<(), ClassifiedError> {
        let method = match priority {
            TorrentPriority::Top => "queue-move-top",
            TorrentPriority::Up => "queue-move-up",
            TorrentPriority::Down => "queue-move-down",
            TorrentPriority::Bottom => "queue-move-bottom",
        };
        self.rpc_fire(method, json!({ "ids": [hash] })).await
    }

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), ClassifiedError> {
        // torrent-set replaces the label list wholesale
        self.rpc_fire("torrent-set", json!({ "ids": [hash], "labels": tags }))
            .await
    }
}
