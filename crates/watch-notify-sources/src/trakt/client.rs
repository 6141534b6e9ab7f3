use crate::error::SourceError;
use crate::traits::HistorySource;
use crate::trakt::api;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};
use watch_notify_config::TraktConfig;
use watch_notify_models::WatchEvent;

/// Read-only view of one user's Trakt watch history
#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    base_url: String,
    client_id: String,
    username: String,
    access_token: Option<String>,
}

impl TraktClient {
    pub fn new(client: Arc<Client>, config: &TraktConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            username: config.username.clone(),
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The history body as returned by Trakt, for inspection commands
    pub async fn fetch_raw(&self, limit: u32) -> Result<serde_json::Value, SourceError> {
        let body = self.history_body(limit).await?;
        serde_json::from_str(&body)
            .map_err(|source| SourceError::Decode { service: api::SERVICE, source })
    }

    async fn history_body(&self, limit: u32) -> Result<String, SourceError> {
        api::get_history_body(
            &self.client,
            &self.base_url,
            &self.username,
            &self.client_id,
            self.access_token.as_deref(),
            limit,
        )
        .await
    }
}

#[async_trait]
impl HistorySource for TraktClient {
    fn source_name(&self) -> &str {
        "trakt"
    }

    async fn fetch_recent(&self, limit: u32) -> Result<Vec<WatchEvent>, SourceError> {
        let body = self.history_body(limit).await?;
        let events = api::parse_history(&body)?;

        debug!(count = events.len(), "Parsed Trakt history");
        if events.is_empty() {
            info!(username = %self.username, "Trakt history is empty");
        }
        Ok(events)
    }
}
