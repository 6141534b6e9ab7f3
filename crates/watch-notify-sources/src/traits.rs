use async_trait::async_trait;
use watch_notify_models::{EnrichmentResult, ExternalRatings, MediaKind, WatchEvent};
use crate::error::{DispatchError, SourceError};

/// The watch-history feed
#[async_trait]
pub trait HistorySource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Most recent events first, in feed order
    async fn fetch_recent(&self, limit: u32) -> Result<Vec<WatchEvent>, SourceError>;
}

/// Secondary metadata lookup. Best effort: `Ok(None)` whenever there is
/// nothing usable, `Err` only for transport or decoding failures.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn fetch_metadata(
        &self,
        kind: MediaKind,
        secondary_id: Option<u64>,
    ) -> Result<Option<EnrichmentResult>, SourceError>;

    /// Resolve the artwork reference to a URL without touching the network
    fn artwork_url(&self, enrichment: &EnrichmentResult) -> Option<String>;
}

/// Tertiary rating source, keyed by IMDb id. Unrated or unknown titles
/// come back as empty ratings, not errors.
#[async_trait]
pub trait RatingsProvider: Send + Sync {
    async fn ratings(&self, imdb_id: &str) -> Result<ExternalRatings, SourceError>;
}

/// Raw sends to the messaging channel
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), DispatchError>;
    async fn send_photo(&self, chat_id: &str, photo_url: &str, caption: &str) -> Result<(), DispatchError>;
}
