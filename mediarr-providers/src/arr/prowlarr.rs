//! Prowlarr (indexer aggregator) client
//!
//! Prowlarr mounts its API under `/api/v1`, unlike its siblings.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ArrClient, ArrHttp};
use crate::config::ProviderConnectionConfig;
use crate::error::{ClassifiedError, ErrorKind};

pub struct ProwlarrClient {
    http: ArrHttp,
}

impl ProwlarrClient {
    pub fn new(config: ProviderConnectionConfig) -> Result<Self, ClassifiedError> {
        Ok(Self {
            http: ArrHttp::new(config, "/api/v1")?,
        })
    }

    /// Applications Prowlarr syncs indexers to (Sonarr, Radarr, ...).
    pub async fn applications(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.http.get_json("/applications").await
    }

    /// Search across indexers. `indexer_ids` and `categories` narrow the
    /// query; empty slices search everything.
    pub async fn search(
        &self,
        query: &str,
        indexer_ids: &[i64],
        categories: &[i64],
    ) -> Result<Vec<Value>, ClassifiedError> {
        let mut params = vec![("query", query.to_string())];
        for id in indexer_ids {
            params.push(("indexerIds", id.to_string()));
        }
        for category in categories {
            params.push(("categories", category.to_string()));
        }
        self.http.get_json_with_query("/search", &params).await
    }

    /// A single indexer; `None` when the id is unknown.
    pub async fn indexer_by_id(&self, indexer_id: i64) -> Result<Option<Value>, ClassifiedError> {
        match self.http.get_json(&format!("/indexer/{indexer_id}")).await {
            Ok(indexer) => Ok(Some(indexer)),
            Err(err) if err.kind == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn delete_indexer(&self, indexer_id: i64) -> Result<(), ClassifiedError> {
        self.http.delete(&format!("/indexer/{indexer_id}"), &[]).await
    }

    /// Ask Prowlarr to test one configured indexer.
    pub async fn test_indexer(&self, indexer_id: i64) -> Result<(), ClassifiedError> {
        // Prowlarr wants the full indexer document on the test endpoint
        let indexer: Value = self.http.get_json(&format!("/indexer/{indexer_id}")).await?;
        let _: Value = self.http.post_json("/indexer/test", &indexer).await?;
        Ok(())
    }

    /// Ask Prowlarr to test every configured indexer.
    pub async fn test_all_indexers(&self) -> Result<(), ClassifiedError> {
        let _: Value = self.http.post_json("/indexer/testall", &json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl ArrClient for ProwlarrClient {
    fn kind(&self) -> &'static str {
        "prowlarr"
    }

    fn http(&self) -> &ArrHttp {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;

    #[test]
    fn test_kind() {
        let config = ProviderConnectionConfig::new(
            "http://prowlarr:9696",
            Credential::api_key("0123456789abcdef"),
        )
        .unwrap();
        let client = ProwlarrClient::new(config).unwrap();
        assert_eq!(client.kind(), "prowlarr");
    }
}
