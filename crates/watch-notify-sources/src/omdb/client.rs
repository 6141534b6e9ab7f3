use crate::error::SourceError;
use crate::traits::RatingsProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use watch_notify_config::OmdbConfig;
use watch_notify_models::ExternalRatings;

const SERVICE: &str = "OMDb";
const ROTTEN_TOMATOES: &str = "Rotten Tomatoes";

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<OmdbRating>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

fn available(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != "N/A").then(|| value.to_string())
}

/// OMDb answers 200 with `"Response": "False"` for unknown ids and uses
/// "N/A" for missing ratings; both count as no rating.
pub fn extract_ratings(response: &OmdbResponse) -> ExternalRatings {
    if response.response.as_deref() != Some("True") {
        return ExternalRatings::default();
    }

    ExternalRatings {
        imdb: response.imdb_rating.as_deref().and_then(available),
        tomatometer: response
            .ratings
            .iter()
            .find(|rating| rating.source == ROTTEN_TOMATOES)
            .and_then(|rating| available(&rating.value)),
    }
}

#[derive(Clone)]
pub struct OmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(client: Arc<Client>, config: &OmdbConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl RatingsProvider for OmdbClient {
    async fn ratings(&self, imdb_id: &str) -> Result<ExternalRatings, SourceError> {
        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        debug!(imdb_id, "Fetching OMDb ratings");

        let response = self
            .client
            .get(&url)
            .query(&[("i", imdb_id), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| SourceError::http(SERVICE, source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| SourceError::http(SERVICE, source))?;
        let parsed: OmdbResponse = serde_json::from_str(&body)
            .map_err(|source| SourceError::Decode { service: SERVICE, source })?;

        if let Some(error) = &parsed.error {
            debug!(imdb_id, error = %error, "OMDb returned no match");
        }
        Ok(extract_ratings(&parsed))
    }
}
