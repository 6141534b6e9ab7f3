//! Builds the concrete upstream clients from configuration.

use crate::http::create_http_client;
use crate::omdb::OmdbClient;
use crate::telegram::TelegramClient;
use crate::tmdb::TmdbClient;
use crate::trakt::TraktClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use watch_notify_config::Config;

/// Every client one run needs, sharing a single connection pool
#[derive(Clone)]
pub struct SourceSet {
    pub trakt: TraktClient,
    pub tmdb: TmdbClient,
    pub omdb: Option<OmdbClient>,
    pub telegram: TelegramClient,
}

impl SourceSet {
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.pipeline.http_timeout_secs);
        let client = Arc::new(create_http_client(timeout));

        let omdb = config
            .omdb
            .as_ref()
            .filter(|_| config.is_omdb_configured())
            .map(|omdb| OmdbClient::new(Arc::clone(&client), omdb));
        debug!(
            timeout_secs = config.pipeline.http_timeout_secs,
            omdb = omdb.is_some(),
            "Created upstream clients"
        );

        Self {
            trakt: TraktClient::new(Arc::clone(&client), &config.trakt),
            tmdb: TmdbClient::new(Arc::clone(&client), &config.tmdb),
            omdb,
            telegram: TelegramClient::new(client, &config.telegram),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watch_notify_config::OmdbConfig;

    #[test]
    fn test_omdb_only_when_configured() {
        let mut config = Config::default();
        assert!(SourceSet::from_config(&config).omdb.is_none());

        config.omdb = Some(OmdbConfig {
            api_key: "abc123".to_string(),
            base_url: "https://www.omdbapi.com".to_string(),
        });
        assert!(SourceSet::from_config(&config).omdb.is_some());
    }
}
