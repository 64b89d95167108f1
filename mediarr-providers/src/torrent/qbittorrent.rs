//! qBittorrent Web API client
//!
//! Authentication is a session cookie: credentials go to
//! `/api/v2/auth/login` as a form post and the `SID` cookie from the
//! response is replayed on every subsequent request. The cookie is cached
//! per client instance and re-acquired lazily when it ages past the TTL or
//! the server answers 403; there is no background refresh. Concurrent
//! requests may race to re-login after a 403 — the duplicate logins are
//! harmless and the last cookie written wins.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{
    normalize, AddTorrentOptions, CanonicalTorrent, TorrentBackend, TorrentClient, TorrentFilter,
    TorrentPriority,
};
use crate::config::ProviderConnectionConfig;
use crate::error::{check_response, json_with_limit, redact_url, ClassifiedError, ErrorKind};
use crate::resilience::{execute, timeout};
use crate::types::ConnectionTestResult;

/// How long a session cookie is trusted before the next request re-logs in.
const SESSION_TTL: Duration = Duration::from_secs(3600);

/// qBittorrent reports this ETA when it cannot estimate one.
const ETA_INFINITY: i64 = 8_640_000;

static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .timeout(timeout::HTTP_REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build qBittorrent shared HTTP client")
});

#[derive(Debug)]
struct SessionCookie {
    cookie: String,
    acquired_at: Instant,
}

#[derive(Debug)]
pub struct QbittorrentClient {
    config: ProviderConnectionConfig,
    client: Client,
    session: RwLock<Option<SessionCookie>>,
}

impl QbittorrentClient {
    pub fn new(config: ProviderConnectionConfig) -> Result<Self, ClassifiedError> {
        config.validate()?;
        if config.username_password().is_none() {
            return Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "qBittorrent requires a username/password credential.",
            ));
        }
        Ok(Self {
            config,
            client: SHARED_CLIENT.clone(),
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Exchange credentials for a fresh `SID` cookie.
    ///
    /// qBittorrent answers 200 with body `Fails.` and no cookie on bad
    /// credentials, so the cookie's presence is the success signal.
    async fn login(&self) -> Result<String, ClassifiedError> {
        let url = self.url("/api/v2/auth/login");
        let (username, password) = self.config.username_password().ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                "qBittorrent requires a username/password credential.",
            )
        })?;

        let resp = self
            .client
            .post(&url)
            .header(REFERER, &self.config.base_url)
            .form(&[("username", username), ("password", password)])
            .timeout(self.config.timeout)
            .send()
            .await?;
        let resp = check_response(resp)?;

        // the cookie pair, verbatim up to the first attribute separator
        let cookie = resp
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(';').next())
            .map(|pair| pair.trim().to_string())
            .filter(|pair| pair.starts_with("SID="));

        let Some(cookie) = cookie else {
            return Err(ClassifiedError::new(
                ErrorKind::AuthFailed,
                "Authentication failed. Please check your credentials.",
            ));
        };

        tracing::debug!(base_url = %self.config.base_url, "qBittorrent session established");
        *self.session.write() = Some(SessionCookie {
            cookie: cookie.clone(),
            acquired_at: Instant::now(),
        });
        Ok(cookie)
    }

    async fn session_cookie(&self) -> Result<String, ClassifiedError> {
        if let Some(session) = self.session.read().as_ref() {
            if session.acquired_at.elapsed() < SESSION_TTL {
                return Ok(session.cookie.clone());
            }
        }
        self.login().await
    }

    /// POST a form to an authenticated endpoint, re-logging in once if the
    /// cached cookie is rejected with 403.
    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::Response, ClassifiedError> {
        let url = self.url(path);
        let cookie = self.session_cookie().await?;
        let resp = self
            .client
            .post(&url)
            .header(COOKIE, &cookie)
            .form(form)
            .timeout(self.config.timeout)
            .send()
            .await?;

        if resp.status() == StatusCode::FORBIDDEN {
            tracing::debug!(url = %redact_url(&url), "session cookie rejected, re-authenticating");
            self.session.write().take();
            let cookie = self.login().await?;
            let resp = self
                .client
                .post(&url)
                .header(COOKIE, &cookie)
                .form(form)
                .timeout(self.config.timeout)
                .send()
                .await?;
            return check_response(resp);
        }
        check_response(resp)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, ClassifiedError> {
        let url = self.url(path);
        let cookie = self.session_cookie().await?;
        let resp = self
            .client
            .get(&url)
            .header(COOKIE, &cookie)
            .query(query)
            .timeout(self.config.timeout)
            .send()
            .await?;

        if resp.status() == StatusCode::FORBIDDEN {
            tracing::debug!(url = %redact_url(&url), "session cookie rejected, re-authenticating");
            self.session.write().take();
            let cookie = self.login().await?;
            let resp = self
                .client
                .get(&url)
                .header(COOKIE, &cookie)
                .query(query)
                .timeout(self.config.timeout)
                .send()
                .await?;
            return check_response(resp);
        }
        check_response(resp)
    }

    /// Fire a mutating endpoint, discarding the body.
    async fn fire(&self, path: &str, form: &[(&str, String)]) -> Result<(), ClassifiedError> {
        execute(
            || async {
                self.post_form(path, form).await?;
                Ok(())
            },
            &self.config.retry,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct QbtTorrent {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    size: i64,
    #[serde(default)]
    downloaded: i64,
    #[serde(default)]
    uploaded: i64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    upspeed: i64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    ratio: f64,
}

impl QbtTorrent {
    fn into_canonical(self) -> CanonicalTorrent {
        CanonicalTorrent {
            state: normalize(TorrentBackend::Qbittorrent, &self.state),
            native_state: self.state,
            hash: self.hash,
            name: self.name,
            progress: self.progress,
            size_bytes: self.size,
            downloaded_bytes: self.downloaded,
            uploaded_bytes: self.uploaded,
            download_rate: self.dlspeed,
            upload_rate: self.upspeed,
            eta_seconds: (self.eta > 0 && self.eta < ETA_INFINITY).then_some(self.eta),
            category: (!self.category.is_empty()).then_some(self.category),
            tags: self
                .tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(ToString::to_string)
                .collect(),
            save_path: (!self.save_path.is_empty()).then_some(self.save_path),
            added_on: (self.added_on > 0).then_some(self.added_on),
            ratio: self.ratio,
        }
    }
}

#[async_trait]
impl TorrentClient for QbittorrentClient {
    fn backend(&self) -> TorrentBackend {
        TorrentBackend::Qbittorrent
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        let result: Result<String, ClassifiedError> = execute(
            || async {
                let resp = self.get("/api/v2/app/version", &[]).await?;
                resp.text().await.map_err(Into::into)
            },
            &self.config.retry,
        )
        .await;
        match result {
            Ok(version) => {
                let mut details = HashMap::new();
                details.insert("backend".to_string(), "qbittorrent".to_string());
                ConnectionTestResult::connected(Some(version.trim().to_string()), details)
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
        // category and hashes are filtered server-side; canonical state,
        // tag and sort are applied after normalization
        let mut query = Vec::new();
        if let Some(category) = &filter.category {
            query.push(("category", category.clone()));
        }
        if !filter.hashes.is_empty() {
            query.push(("hashes", filter.hashes.join("|")));
        }

        let records: Vec<QbtTorrent> = execute(
            || async {
                let resp = self.get("/api/v2/torrents/info", &query).await?;
                json_with_limit(resp).await
            },
            &self.config.retry,
        )
        .await?;

        let mut torrents: Vec<CanonicalTorrent> =
            records.into_iter().map(QbtTorrent::into_canonical).collect();
        filter.apply(&mut torrents);
        Ok(torrents)
    }

    async fn add_torrent(&self, options: &AddTorrentOptions) -> Result<(), ClassifiedError> {
        let mut form = vec![("urls", options.urls.join("\n"))];
        if let Some(category) = &options.category {
            form.push(("category", category.clone()));
        }
        if !options.tags.is_empty() {
            form.push(("tags", options.tags.join(",")));
        }
        if let Some(save_path) = &options.save_path {
            form.push(("savepath", save_path.clone()));
        }
        if options.paused {
            form.push(("paused", "true".to_string()));
        }
        self.fire("/api/v2/torrents/add", &form).await
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), ClassifiedError> {
        self.fire(
            "/api/v2/torrents/delete",
            &[
                ("hashes", hash.to_string()),
                ("deleteFiles", delete_files.to_string()),
            ],
        )
        .await
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.fire("/api/v2/torrents/pause", &[("hashes", hash.to_string())])
            .await
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.fire("/api/v2/torrents/resume", &[("hashes", hash.to_string())])
            .await
    }

    async fn recheck_torrent(&self, hash: &str) -> Result<(), ClassifiedError> {
        self.fire("/api/v2/torrents/recheck", &[("hashes", hash.to_string())])
            .await
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), ClassifiedError> {
        self.fire(
            "/api/v2/torrents/setCategory",
            &[
                ("hashes", hash.to_string()),
                ("category", category.to_string()),
            ],
        )
        .await
    }

    async fn set_priority(
        &self,
        hash: &str,
        priority: TorrentPriority,
    ) -> Result<(), ClassifiedError> {
        let endpoint = match priority {
            TorrentPriority::Top => "/api/v2/torrents/topPrio",
            TorrentPriority::Up => "/api/v2/torrents/increasePrio",
            TorrentPriority::Down => "/api/v2/torrents/decreasePrio",
            TorrentPriority::Bottom => "/api/v2/torrents/bottomPrio",
        };
        self.fire(endpoint, &[("hashes", hash.to_string())]).await
    }

    async fn add_tags(&self, hash: &str, tags: &[String]) -> Result<(), ClassifiedError> {
        self.fire(
            "/api/v2/torrents/addTags",
            &[("hashes", hash.to_string()), ("tags", tags.join(","))],
        )
        .await
    }
}
