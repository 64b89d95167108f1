//! plex.tv HTTP client

use std::sync::LazyLock;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use super::types::{PinResponse, PlexUser};
use crate::error::{check_response, json_with_limit, ClassifiedError};
use crate::resilience::{execute, timeout, RetryPolicy};

const PLEX_TV: &str = "https://plex.tv";
const PRODUCT: &str = "Mediarr";

const X_PLEX_CLIENT_IDENTIFIER: &str = "X-Plex-Client-Identifier";
const X_PLEX_PRODUCT: &str = "X-Plex-Product";
const X_PLEX_VERSION: &str = "X-Plex-Version";
const X_PLEX_TOKEN: &str = "X-Plex-Token";

static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(timeout::HTTP_CONNECT_TIMEOUT)
        .timeout(timeout::HTTP_REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build Plex shared HTTP client")
});

/// plex.tv client bound to one client identifier.
///
/// plex.tv keys the whole pairing flow on `X-Plex-Client-Identifier`: the
/// identifier that creates a PIN must also poll it, so each pairing session
/// gets its own ephemeral client.
#[derive(Debug, Clone)]
pub struct PlexClient {
    client: Client,
    base_url: String,
    client_identifier: String,
    retry: RetryPolicy,
}

impl PlexClient {
    #[must_use]
    pub fn new(client_identifier: impl Into<String>) -> Self {
        Self::with_base_url(PLEX_TV, client_identifier)
    }

    /// Point the client at a different host. Used by tests.
    #[must_use]
    pub fn with_base_url(
        base_url: impl Into<String>,
        client_identifier: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: SHARED_CLIENT.clone(),
            base_url,
            client_identifier: client_identifier.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn client_identifier(&self) -> &str {
        &self.client_identifier
    }

    fn headers(&self, token: Option<&str>) -> Result<HeaderMap, ClassifiedError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            X_PLEX_CLIENT_IDENTIFIER,
            HeaderValue::from_str(&self.client_identifier)?,
        );
        headers.insert(X_PLEX_PRODUCT, HeaderValue::from_static(PRODUCT));
        headers.insert(
            X_PLEX_VERSION,
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            headers.insert(X_PLEX_TOKEN, value);
        }
        Ok(headers)
    }

    /// Request a new strong pairing PIN.
    pub async fn create_pin(&self) -> Result<PinResponse, ClassifiedError> {
        let url = format!("{}/api/v2/pins", self.base_url);
        execute(
            || async {
                let resp = self
                    .client
                    .post(&url)
                    .headers(self.headers(None)?)
                    .query(&[("strong", "true")])
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.retry,
        )
        .await
    }

    /// Poll a PIN's pairing status.
    pub async fn check_pin(&self, pin_id: i64) -> Result<PinResponse, ClassifiedError> {
        let url = format!("{}/api/v2/pins/{pin_id}", self.base_url);
        execute(
            || async {
                let resp = self
                    .client
                    .get(&url)
                    .headers(self.headers(None)?)
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.retry,
        )
        .await
    }

    /// Fetch the account profile for a granted token.
    pub async fn user(&self, token: &str) -> Result<PlexUser, ClassifiedError> {
        let url = format!("{}/api/v2/user", self.base_url);
        execute(
            || async {
                let resp = self
                    .client
                    .get(&url)
                    .headers(self.headers(Some(token))?)
                    .send()
                    .await?;
                json_with_limit(check_response(resp)?).await
            },
            &self.retry,
        )
        .await
    }

    /// The plex.tv/link URL a user opens (or scans) to enter the code.
    #[must_use]
    pub fn qr_link_url(&self, code: &str) -> String {
        format!(
            "https://plex.tv/link/?code={}&clientID={}",
            code, self.client_identifier
        )
    }
}
