//! Arr-family HTTP clients (Sonarr, Radarr, Prowlarr)
//!
//! The three applications share a system/health/profile API surface and an
//! `X-Api-Key` authentication scheme; each adds its own resource
//! operations. `ArrHttp` is the shared base every concrete client composes;
//! the `ArrClient` trait expresses the common capability set through
//! default methods delegating to it.

pub mod prowlarr;
pub mod radarr;
pub mod sonarr;
pub mod types;

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ProviderConnectionConfig;
use crate::error::{check_response, json_with_limit, redact_url, ClassifiedError, ErrorKind};
use crate::resilience::{execute, timeout};
use crate::types::ConnectionTestResult;

pub use prowlarr::ProwlarrClient;
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
pub use types::{HealthCheck, LogPage, QualityProfile, RootFolder, SystemStatus, Tag};

const X_API_KEY: &str = "X-Api-Key";

/// Shared HTTP client for all Arr requests (connection pooling).
/// Redirects are disabled so a misconfigured base URL cannot bounce
/// credentials to an unexpected host.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .timeout(timeout::HTTP_REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build Arr shared HTTP client")
});

/// Shared base for Arr-family clients: header building, request helpers
/// and retry wiring. Concrete clients compose it rather than inherit.
#[derive(Debug)]
pub struct ArrHttp {
    config: ProviderConnectionConfig,
    api_base: String,
    api_key: String,
    client: Client,
}

impl ArrHttp {
    /// Build the base for a concrete client. `api_version` is the path
    /// prefix the application mounts its API under (`/api/v3` for Sonarr
    /// and Radarr, `/api/v1` for Prowlarr).
    pub fn new(
        config: ProviderConnectionConfig,
        api_version: &str,
    ) -> Result<Self, ClassifiedError> {
        config.validate()?;
        let api_key = config
            .api_key()
            .ok_or_else(|| {
                ClassifiedError::new(
                    ErrorKind::Unknown,
                    "This provider requires an API key credential.",
                )
            })?
            .to_string();
        let api_base = format!("{}{}", config.base_url, api_version);
        Ok(Self {
            config,
            api_base,
            api_key,
            client: SHARED_CLIENT.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn headers(&self) -> Result<HeaderMap, ClassifiedError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&self.api_key)?;
        key.set_sensitive(true);
        headers.insert(X_API_KEY, key);
        Ok(headers)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClassifiedError> {
        self.get_json_with_query(path, &[]).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClassifiedError> {
        let url = self.url(path);
        execute(
            || async {
                tracing::debug!(url = %redact_url(&url), "GET");
                let resp = self
                    .client
                    .get(&url)
                    .headers(self.headers()?)
                    .query(query)
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.config.retry,
        )
        .await
    }

    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClassifiedError> {
        let url = self.url(path);
        execute(
            || async {
                tracing::debug!(url = %redact_url(&url), "POST");
                let resp = self
                    .client
                    .post(&url)
                    .headers(self.headers()?)
                    .json(body)
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.config.retry,
        )
        .await
    }

    pub async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClassifiedError> {
        let url = self.url(path);
        execute(
            || async {
                tracing::debug!(url = %redact_url(&url), "PUT");
                let resp = self
                    .client
                    .put(&url)
                    .headers(self.headers()?)
                    .json(body)
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.config.retry,
        )
        .await
    }

    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(), ClassifiedError> {
        let url = self.url(path);
        execute(
            || async {
                tracing::debug!(url = %redact_url(&url), "DELETE");
                let resp = self
                    .client
                    .delete(&url)
                    .headers(self.headers()?)
                    .query(query)
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                check_response(resp)?;
                Ok(())
            },
            &self.config.retry,
        )
        .await
    }

    /// Probe the instance through `GET /system/status`. Never fails;
    /// version and platform fields are extracted defensively since
    /// different provider versions disagree on field casing.
    pub async fn probe(&self) -> ConnectionTestResult {
        match self.get_json::<SystemStatus>("/system/status").await {
            Ok(status) => {
                let mut details = HashMap::new();
                if !status.app_name.is_empty() {
                    details.insert("appName".to_string(), status.app_name);
                }
                if !status.instance_name.is_empty() {
                    details.insert("instanceName".to_string(), status.instance_name);
                }
                if !status.os_name.is_empty() {
                    details.insert("osName".to_string(), status.os_name);
                }
                if !status.branch.is_empty() {
                    details.insert("branch".to_string(), status.branch);
                }
                ConnectionTestResult::connected(Some(status.version), details)
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

    /// Fetch the current representation, shallow-merge `fields` over it and
    /// PUT the merged document back. The Arr APIs require the complete
    /// resource on update, not a partial patch.
    pub async fn fetch_merge_put(
        &self,
        path: &str,
        fields: &Value,
    ) -> Result<Value, ClassifiedError> {
        let current: Value = self.get_json(path).await?;
        let merged = merge_resource(current, fields);
        self.put_json(path, &merged).await
    }
}

/// Shallow-merge `patch` object fields over `current`.
#[must_use]
pub(crate) fn merge_resource(mut current: Value, patch: &Value) -> Value {
    if let (Some(target), Some(source)) = (current.as_object_mut(), patch.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    current
}

/// Capability set shared by every Arr-family application.
#[async_trait]
pub trait ArrClient: Send + Sync {
    /// Provider kind name (e.g. "sonarr")
    fn kind(&self) -> &'static str;

    /// The shared HTTP base this client composes
    fn http(&self) -> &ArrHttp;

    /// Probe the instance. Never fails; always returns a value.
    async fn test_connection(&self) -> ConnectionTestResult {
        self.http().probe().await
    }

    async fn system_status(&self) -> Result<SystemStatus, ClassifiedError> {
        self.http().get_json("/system/status").await
    }

    async fn health(&self) -> Result<Vec<HealthCheck>, ClassifiedError> {
        self.http().get_json("/health").await
    }

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>, ClassifiedError> {
        self.http().get_json("/qualityprofile").await
    }

    async fn root_folders(&self) -> Result<Vec<RootFolder>, ClassifiedError> {
        self.http().get_json("/rootfolder").await
    }

    async fn tags(&self) -> Result<Vec<Tag>, ClassifiedError> {
        self.http().get_json("/tag").await
    }

    async fn create_tag(&self, label: &str) -> Result<Tag, ClassifiedError> {
        self.http().post_json("/tag", &json!({ "label": label })).await
    }

    /// Configured download clients, in the provider's native shape.
    async fn download_clients(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.http().get_json("/downloadclient").await
    }

    /// Configured indexers, in the provider's native shape.
    async fn indexers(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.http().get_json("/indexer").await
    }

    async fn logs(&self, page: u32, page_size: u32) -> Result<LogPage, ClassifiedError> {
        self.http()
            .get_json_with_query(
                "/log",
                &[
                    ("page", page.to_string()),
                    ("pageSize", page_size.to_string()),
                    ("sortKey", "time".to_string()),
                    ("sortDirection", "descending".to_string()),
                ],
            )
            .await
    }

    async fn clear_logs(&self) -> Result<(), ClassifiedError> {
        self.http().delete("/log", &[]).await
    }
}
