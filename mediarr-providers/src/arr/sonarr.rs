//! Sonarr (series manager) client

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ArrClient, ArrHttp};
use crate::config::ProviderConnectionConfig;
use crate::error::{ClassifiedError, ErrorKind};

pub struct SonarrClient {
    http: ArrHttp,
}

impl SonarrClient {
    pub fn new(config: ProviderConnectionConfig) -> Result<Self, ClassifiedError> {
        Ok(Self {
            http: ArrHttp::new(config, "/api/v3")?,
        })
    }

    /// All series in the library, in Sonarr's native shape.
    pub async fn series(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.http.get_json("/series").await
    }

    /// A single series; `None` when the id is unknown.
    pub async fn series_by_id(&self, id: i64) -> Result<Option<Value>, ClassifiedError> {
        match self.http.get_json(&format!("/series/{id}")).await {
            Ok(series) => Ok(Some(series)),
            Err(err) if err.kind == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Look a series up by its TVDB id; `None` when nothing matches.
    pub async fn lookup_by_tvdb_id(&self, tvdb_id: i64) -> Result<Option<Value>, ClassifiedError> {
        let results: Vec<Value> = self
            .http
            .get_json_with_query("/series/lookup", &[("term", format!("tvdb:{tvdb_id}"))])
            .await?;
        Ok(results.into_iter().next())
    }

    pub async fn add_series(&self, series: &Value) -> Result<Value, ClassifiedError> {
        self.http.post_json("/series", series).await
    }

    /// Sonarr requires the complete series object on update, so the current
    /// representation is fetched and the caller's fields merged over it.
    pub async fn update_series(&self, id: i64, fields: &Value) -> Result<Value, ClassifiedError> {
        self.http.fetch_merge_put(&format!("/series/{id}"), fields).await
    }

    pub async fn delete_series(
        &self,
        id: i64,
        delete_files: bool,
    ) -> Result<(), ClassifiedError> {
        self.http
            .delete(
                &format!("/series/{id}"),
                &[("deleteFiles", delete_files.to_string())],
            )
            .await
    }

    pub async fn episodes(&self, series_id: i64) -> Result<Vec<Value>, ClassifiedError> {
        self.http
            .get_json_with_query("/episode", &[("seriesId", series_id.to_string())])
            .await
    }

    /// Queue an indexer search for one season.
    pub async fn search_season(
        &self,
        series_id: i64,
        season_number: i32,
    ) -> Result<Value, ClassifiedError> {
        self.http
            .post_json(
                "/command",
                &json!({
                    "name": "SeasonSearch",
                    "seriesId": series_id,
                    "seasonNumber": season_number,
                }),
            )
            .await
    }

    /// Queue an indexer search for a whole series.
    pub async fn search_series(&self, series_id: i64) -> Result<Value, ClassifiedError> {
        self.http
            .post_json(
                "/command",
                &json!({ "name": "SeriesSearch", "seriesId": series_id }),
            )
            .await
    }
}

#[async_trait]
impl ArrClient for SonarrClient {
    fn kind(&self) -> &'static str {
        "sonarr"
    }

    fn http(&self) -> &ArrHttp {
        &self.http
    }
}
