use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use watch_notify_config::Config;
use watch_notify_models::{EnrichmentResult, ExternalRatings, WatchEvent};
use watch_notify_sources::{Enricher, HistorySource, RatingsProvider, SourceSet};
use crate::dedup::DedupStore;
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::format::{first_message, second_message, DisplayZone};
use crate::lock::RunLock;
use crate::store::StateStore;

pub const DEFAULT_HISTORY_LIMIT: u32 = 5;

/// An item whose announcement was not delivered this run
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub title: String,
    pub error: String,
}

/// What a dry run would have sent for one item
#[derive(Debug, Clone, Serialize)]
pub struct MessagePreview {
    pub item_id: String,
    pub first: String,
    pub second: String,
    pub artwork_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub notified: usize,
    pub skipped_known: usize,
    pub skipped_unsupported: usize,
    pub failures: Vec<ItemFailure>,
    pub cursor: Option<DateTime<Utc>>,
    pub pruned: usize,
    pub duration: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previews: Vec<MessagePreview>,
}

struct Announcement {
    first: String,
    second: String,
    artwork_url: Option<String>,
}

/// One pass over the feed: fetch, skip what was already announced, enrich,
/// format, dispatch, record. Items are handled strictly in feed order.
pub struct Orchestrator {
    history: Arc<dyn HistorySource>,
    enricher: Arc<dyn Enricher>,
    ratings: Option<Arc<dyn RatingsProvider>>,
    dispatcher: Dispatcher,
    dedup: DedupStore,
    chat_id: String,
    display_name: String,
    handle: Option<String>,
    zone: DisplayZone,
    history_limit: u32,
    retention: Option<chrono::Duration>,
    run_lock: Option<(PathBuf, chrono::Duration)>,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(
        history: Arc<dyn HistorySource>,
        enricher: Arc<dyn Enricher>,
        dispatcher: Dispatcher,
        dedup: DedupStore,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            history,
            enricher,
            ratings: None,
            dispatcher,
            dedup,
            chat_id: chat_id.into(),
            display_name: "Someone".to_string(),
            handle: None,
            zone: DisplayZone::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            retention: None,
            run_lock: None,
            dry_run: false,
        }
    }

    /// Wire the configured upstreams together. The run lock is not set here;
    /// callers that own a state directory add it with `with_run_lock`.
    pub fn from_config(config: &Config, sources: SourceSet, store: Arc<dyn StateStore>) -> Self {
        let dispatcher = Dispatcher::new(Arc::new(sources.telegram))
            .with_delay(Duration::from_millis(config.pipeline.message_delay_ms));

        let mut orchestrator = Self::new(
            Arc::new(sources.trakt),
            Arc::new(sources.tmdb),
            dispatcher,
            DedupStore::new(store),
            config.telegram.chat_id.clone(),
        )
        .with_identity(config.telegram.display_name.clone(), config.telegram.handle.clone())
        .with_zone(DisplayZone::new(config.pipeline.utc_offset_hours, config.pipeline.zone_label.clone()))
        .with_history_limit(config.trakt.history_limit)
        .with_retention_days(config.pipeline.retention_days);

        if let Some(omdb) = sources.omdb {
            orchestrator = orchestrator.with_ratings(Arc::new(omdb));
        }
        orchestrator
    }

    pub fn with_ratings(mut self, ratings: Arc<dyn RatingsProvider>) -> Self {
        self.ratings = Some(ratings);
        self
    }

    pub fn with_identity(mut self, display_name: String, handle: Option<String>) -> Self {
        self.display_name = display_name;
        self.handle = handle;
        self
    }

    pub fn with_zone(mut self, zone: DisplayZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_retention_days(mut self, days: Option<u32>) -> Self {
        self.retention = days.filter(|d| *d > 0).map(|d| chrono::Duration::days(i64::from(d)));
        self
    }

    pub fn with_run_lock(mut self, path: PathBuf, stale_after: chrono::Duration) -> Self {
        self.run_lock = Some((path, stale_after));
        self
    }

    /// Format without sending, recording, or moving the cursor
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    #[instrument(skip(self), fields(operation = "check", dry_run = self.dry_run))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let _lock = match &self.run_lock {
            Some((path, stale_after)) => Some(RunLock::acquire(path, *stale_after)?),
            None => None,
        };

        let events = self.history.fetch_recent(self.history_limit).await?;
        info!(
            source = self.history.source_name(),
            fetched = events.len(),
            "Fetched watch history"
        );

        let mut report = RunReport {
            fetched: events.len(),
            ..RunReport::default()
        };

        for event in &events {
            if self.dedup.has_notified(&event.id)? {
                debug!(item_id = %event.id, "Already announced, skipping");
                report.skipped_known += 1;
                continue;
            }
            if !event.kind.is_announceable() {
                debug!(item_id = %event.id, kind = %event.kind, "Unsupported media kind, skipping");
                report.skipped_unsupported += 1;
                continue;
            }

            let announcement = self.prepare(event).await;

            if self.dry_run {
                report.previews.push(MessagePreview {
                    item_id: event.id.clone(),
                    first: announcement.first,
                    second: announcement.second,
                    artwork_url: announcement.artwork_url,
                });
                continue;
            }

            let sent = self
                .dispatcher
                .send_sequence(
                    &self.chat_id,
                    &announcement.first,
                    &announcement.second,
                    announcement.artwork_url.as_deref(),
                )
                .await;

            match sent {
                Ok(()) => {
                    self.dedup.record_notified(&event.id, event.watched_at)?;
                    report.notified += 1;
                    info!(item_id = %event.id, title = %event.display_title(), "Announced");
                }
                Err(e) if e.is_fatal() => {
                    error!(
                        item_id = %event.id,
                        status = ?e.status(),
                        error = %e,
                        "Channel rejected the bot, aborting run"
                    );
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(
                        item_id = %event.id,
                        status = ?e.status(),
                        error = %e,
                        "Failed to announce item, will retry next run"
                    );
                    report.failures.push(ItemFailure {
                        item_id: event.id.clone(),
                        title: event.display_title(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !self.dry_run {
            let now = Utc::now();
            self.dedup.set_cursor(now)?;
            report.cursor = Some(now);

            if let Some(retention) = self.retention {
                report.pruned = self.dedup.prune_older_than(now - retention)?;
            }
        }

        report.duration = start.elapsed();
        info!(
            fetched = report.fetched,
            notified = report.notified,
            skipped_known = report.skipped_known,
            skipped_unsupported = report.skipped_unsupported,
            failed = report.failures.len(),
            pruned = report.pruned,
            duration_ms = report.duration.as_millis() as u64,
            "Run complete"
        );
        Ok(report)
    }

    async fn prepare(&self, event: &WatchEvent) -> Announcement {
        let enrichment = self.enrich(event).await;
        let external = self.external_ratings(event).await;

        // The history feed carries no rating of its own
        let first = first_message(event, &self.display_name, self.handle.as_deref(), &self.zone);
        let second = second_message(event, None, enrichment.as_ref(), &external);
        let artwork_url = enrichment.as_ref().and_then(|e| self.enricher.artwork_url(e));

        Announcement {
            first,
            second,
            artwork_url,
        }
    }

    async fn enrich(&self, event: &WatchEvent) -> Option<EnrichmentResult> {
        let tmdb_id = event.ids.secondary_id()?;
        match self.enricher.fetch_metadata(event.kind, Some(tmdb_id)).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!(item_id = %event.id, tmdb_id, error = %e, "Enrichment failed, sending without metadata");
                None
            }
        }
    }

    async fn external_ratings(&self, event: &WatchEvent) -> ExternalRatings {
        let (Some(provider), Some(imdb_id)) = (self.ratings.as_ref(), event.ids.imdb()) else {
            return ExternalRatings::default();
        };
        match provider.ratings(imdb_id).await {
            Ok(ratings) => {
                if ratings.is_empty() {
                    debug!(item_id = %event.id, imdb_id, "No external ratings available");
                }
                ratings
            }
            Err(e) => {
                warn!(item_id = %event.id, imdb_id, error = %e, "External ratings lookup failed");
                ExternalRatings::default()
            }
        }
    }
}
