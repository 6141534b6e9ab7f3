use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use watch_notify_models::{CrossRefIds, EpisodeRef, MediaKind, WatchEvent};
use crate::error::SourceError;

pub(crate) const SERVICE: &str = "Trakt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<u64>,
    pub slug: Option<String>,
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
    pub tvdb: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktMovie {
    title: Option<String>,
    year: Option<u32>,
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktShow {
    title: Option<String>,
    year: Option<u32>,
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktEpisode {
    title: Option<String>,
    season: Option<u32>,
    number: Option<u32>,
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraktHistoryItem {
    id: u64,
    watched_at: String,
    movie: Option<TraktMovie>,
    show: Option<TraktShow>,
    episode: Option<TraktEpisode>,
}

impl TraktHistoryItem {
    /// Convert to a feed event; `None` when the timestamp is unusable
    pub fn into_event(self) -> Option<WatchEvent> {
        let watched_at = match DateTime::parse_from_rfc3339(&self.watched_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    item_id = self.id,
                    watched_at = %self.watched_at,
                    error = %e,
                    "Skipping history item with unparseable watched_at"
                );
                return None;
            }
        };

        // Episodes arrive with their show; the show's ids are the ones TMDB knows
        let (kind, title, year, ids, episode) = if let Some(movie) = self.movie {
            (MediaKind::Movie, movie.title, movie.year, movie.ids, None)
        } else if let Some(show) = self.show {
            let episode = self.episode.map(|e| EpisodeRef {
                season: e.season,
                number: e.number,
                title: e.title,
            });
            (MediaKind::ShowEpisode, show.title, show.year, show.ids, episode)
        } else if let Some(episode) = self.episode {
            (MediaKind::Unknown, episode.title, None, episode.ids, None)
        } else {
            (MediaKind::Unknown, None, None, TraktIds::default(), None)
        };

        Some(WatchEvent {
            id: self.id.to_string(),
            kind,
            title: title.unwrap_or_else(|| "Unknown".to_string()),
            year,
            watched_at,
            ids: CrossRefIds {
                trakt_id: ids.trakt,
                tmdb_id: ids.tmdb,
                imdb_id: ids.imdb,
            },
            episode,
        })
    }
}

/// Parse a history response body into events, preserving feed order
pub fn parse_history(body: &str) -> Result<Vec<WatchEvent>, SourceError> {
    let items: Vec<TraktHistoryItem> = serde_json::from_str(body)
        .map_err(|source| SourceError::Decode { service: SERVICE, source })?;

    Ok(items.into_iter().filter_map(TraktHistoryItem::into_event).collect())
}

/// Fetch the raw history body for `username`
pub async fn get_history_body(
    client: &Client,
    base_url: &str,
    username: &str,
    client_id: &str,
    access_token: Option<&str>,
    limit: u32,
) -> Result<String, SourceError> {
    let url = format!(
        "{}/users/{}/history",
        base_url.trim_end_matches('/'),
        urlencoding::encode(username)
    );
    debug!(url = %url, limit, "Fetching Trakt history");

    let mut request = client
        .get(&url)
        .query(&[("limit", limit)])
        .header("Content-Type", "application/json")
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id);
    if let Some(token) = access_token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|source| SourceError::http(SERVICE, source))?;

    let status = response.status();
    debug!(status = status.as_u16(), "Trakt history response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|source| SourceError::http(SERVICE, source))
}
