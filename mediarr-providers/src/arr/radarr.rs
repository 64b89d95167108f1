//! Radarr (movie manager) client

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ArrClient, ArrHttp};
use crate::config::ProviderConnectionConfig;
use crate::error::{ClassifiedError, ErrorKind};

pub struct RadarrClient {
    http: ArrHttp,
}

impl RadarrClient {
    pub fn new(config: ProviderConnectionConfig) -> Result<Self, ClassifiedError> {
        Ok(Self {
            http: ArrHttp::new(config, "/api/v3")?,
        })
    }

    pub async fn movies(&self) -> Result<Vec<Value>, ClassifiedError> {
        self.http.get_json("/movie").await
    }

    /// A single movie; `None` when the id is unknown.
    pub async fn movie_by_id(&self, id: i64) -> Result<Option<Value>, ClassifiedError> {
        match self.http.get_json(&format!("/movie/{id}")).await {
            Ok(movie) => Ok(Some(movie)),
            Err(err) if err.kind == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Look a movie up by its TMDB id; `None` when nothing matches.
    pub async fn lookup_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<Value>, ClassifiedError> {
        let results: Vec<Value> = self
            .http
            .get_json_with_query("/movie/lookup", &[("term", format!("tmdb:{tmdb_id}"))])
            .await?;
        Ok(results.into_iter().next())
    }

    pub async fn add_movie(&self, movie: &Value) -> Result<Value, ClassifiedError> {
        self.http.post_json("/movie", movie).await
    }

    /// Radarr requires the complete movie object on update; the caller's
    /// fields are merged over the current representation before the PUT.
    pub async fn update_movie(&self, id: i64, fields: &Value) -> Result<Value, ClassifiedError> {
        self.http.fetch_merge_put(&format!("/movie/{id}"), fields).await
    }

    pub async fn delete_movie(&self, id: i64, delete_files: bool) -> Result<(), ClassifiedError> {
        self.http
            .delete(
                &format!("/movie/{id}"),
                &[("deleteFiles", delete_files.to_string())],
            )
            .await
    }

    /// Queue an indexer search for one movie.
    pub async fn search_movie(&self, movie_id: i64) -> Result<Value, ClassifiedError> {
        self.http
            .post_json(
                "/command",
                &json!({ "name": "MoviesSearch", "movieIds": [movie_id] }),
            )
            .await
    }
}

#[async_trait]
impl ArrClient for RadarrClient {
    fn kind(&self) -> &'static str {
        "radarr"
    }

    fn http(&self) -> &ArrHttp {
        &self.http
    }
}
