use crate::error::SourceError;
use crate::tmdb::api;
use crate::traits::Enricher;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;
use watch_notify_config::TmdbConfig;
use watch_notify_models::{EnrichmentResult, MediaKind};

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    image_base_url: String,
    poster_size: String,
}

impl TmdbClient {
    pub fn new(client: Arc<Client>, config: &TmdbConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            image_base_url: config.image_base_url.clone(),
            poster_size: config.poster_size.clone(),
        }
    }
}

#[async_trait]
impl Enricher for TmdbClient {
    async fn fetch_metadata(
        &self,
        kind: MediaKind,
        secondary_id: Option<u64>,
    ) -> Result<Option<EnrichmentResult>, SourceError> {
        let Some(tmdb_id) = secondary_id.filter(|id| *id != 0) else {
            debug!(kind = %kind, "No TMDB id, skipping enrichment");
            return Ok(None);
        };

        let details = api::get_details(&self.client, &self.base_url, &self.api_key, kind, tmdb_id).await?;
        Ok(details.map(EnrichmentResult::from))
    }

    fn artwork_url(&self, enrichment: &EnrichmentResult) -> Option<String> {
        enrichment
            .poster_path
            .as_deref()
            .and_then(|path| api::poster_url_with(&self.image_base_url, path, &self.poster_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_http_client;
    use std::time::Duration;

    fn unreachable_client() -> TmdbClient {
        let config = TmdbConfig {
            api_key: "TMDBSECRETKEY".to_string(),
            poster_size: "w500".to_string(),
            base_url: "http://127.0.0.1:1/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
        };
        TmdbClient::new(Arc::new(create_http_client(Duration::from_secs(5))), &config)
    }

    #[tokio::test]
    async fn test_missing_id_skips_request() {
        let client = unreachable_client();
        assert!(client.fetch_metadata(MediaKind::Movie, None).await.unwrap().is_none());
        assert!(client.fetch_metadata(MediaKind::Movie, Some(0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let err = unreachable_client()
            .fetch_metadata(MediaKind::Movie, Some(603))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Http { .. }));
        assert!(!err.to_string().contains("TMDBSECRETKEY"));
        assert!(!format!("{:?}", err).contains("TMDBSECRETKEY"));
    }
}
