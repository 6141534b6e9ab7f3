use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use watch_notify_models::{EnrichmentResult, MediaKind};
use crate::error::SourceError;

pub(crate) const SERVICE: &str = "TMDB";

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const DEFAULT_POSTER_SIZE: &str = "w500";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: Option<u64>,
    pub name: String,
}

/// The subset of `/movie/{id}` and `/tv/{id}` both endpoints share, plus
/// the TV-only `episode_run_time`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbDetails {
    pub id: Option<u64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub runtime: Option<u32>,
    pub episode_run_time: Option<Vec<u32>>,
    pub overview: Option<String>,
    pub genres: Option<Vec<TmdbGenre>>,
    pub poster_path: Option<String>,
}

impl From<TmdbDetails> for EnrichmentResult {
    fn from(details: TmdbDetails) -> Self {
        let runtime_minutes = details.runtime.filter(|m| *m > 0).or_else(|| {
            details
                .episode_run_time
                .as_ref()
                .and_then(|times| times.iter().copied().find(|m| *m > 0))
        });

        EnrichmentResult {
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            runtime_minutes,
            overview: details.overview,
            genres: details
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .filter(|name| !name.trim().is_empty())
                .collect(),
            poster_path: details.poster_path.filter(|p| !p.trim().is_empty()),
        }
    }
}

/// Full poster URL at the default size; `None` for a blank path
pub fn poster_url(path: &str) -> Option<String> {
    poster_url_with(DEFAULT_IMAGE_BASE_URL, path, DEFAULT_POSTER_SIZE)
}

pub fn poster_url_with(base_url: &str, path: &str, size: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    Some(format!("{}/{}{}", base_url.trim_end_matches('/'), size, path))
}

fn endpoint(kind: MediaKind) -> Option<&'static str> {
    match kind {
        MediaKind::Movie => Some("movie"),
        MediaKind::ShowEpisode => Some("tv"),
        MediaKind::Unknown => None,
    }
}

/// Look up details by TMDB id. `Ok(None)` for kinds TMDB has no endpoint
/// for and for any non-success response.
pub async fn get_details(
    client: &Client,
    base_url: &str,
    api_key: &str,
    kind: MediaKind,
    tmdb_id: u64,
) -> Result<Option<TmdbDetails>, SourceError> {
    let Some(segment) = endpoint(kind) else {
        return Ok(None);
    };

    // The api key travels as a query parameter, so the full URL is never logged
    let url = format!("{}/{}/{}", base_url.trim_end_matches('/'), segment, tmdb_id);
    debug!(kind = %kind, tmdb_id, "Fetching TMDB details");

    let response = client
        .get(&url)
        .query(&[("api_key", api_key)])
        .send()
        .await
        .map_err(|source| SourceError::http(SERVICE, source))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            tmdb_id,
            status = status.as_u16(),
            body = %body,
            "TMDB lookup unsuccessful, continuing without metadata"
        );
        return Ok(None);
    }

    let body = response
        .text()
        .await
        .map_err(|source| SourceError::http(SERVICE, source))?;
    parse_details(&body).map(Some)
}

pub fn parse_details(body: &str) -> Result<TmdbDetails, SourceError> {
    serde_json::from_str(body).map_err(|source| SourceError::Decode { service: SERVICE, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poster_url() {
        assert_eq!(
            poster_url("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg").as_deref(),
            Some("https://image.tmdb.org/t/p/w500/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg")
        );
        assert_eq!(
            poster_url_with("https://cdn.example/t/p/", "/a.jpg", "original").as_deref(),
            Some("https://cdn.example/t/p/original/a.jpg")
        );
        assert!(poster_url("  ").is_none());
    }

    #[test]
    fn test_movie_details_to_enrichment() {
        let body = r#"{
            "id": 603,
            "title": "The Matrix",
            "vote_average": 8.2,
            "vote_count": 25000,
            "runtime": 136,
            "overview": "Set in the 22nd century...",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "poster_path": "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg"
        }"#;
        let enrichment: EnrichmentResult = parse_details(body).unwrap().into();

        assert_eq!(enrichment.vote_average, Some(8.2));
        assert_eq!(enrichment.vote_count, Some(25000));
        assert_eq!(enrichment.runtime_minutes, Some(136));
        assert_eq!(enrichment.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(enrichment.poster_path.as_deref(), Some("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg"));
    }

    #[test]
    fn test_tv_details_use_episode_run_time() {
        let body = r#"{
            "id": 95396,
            "name": "Severance",
            "episode_run_time": [0, 55],
            "genres": [],
            "poster_path": null,
            "overview": ""
        }"#;
        let enrichment: EnrichmentResult = parse_details(body).unwrap().into();

        assert_eq!(enrichment.runtime_minutes, Some(55));
        assert!(enrichment.genres.is_empty());
        assert!(enrichment.poster_path.is_none());
        assert!(enrichment.synopsis().is_none());
        assert!(enrichment.vote_average.is_none());
    }

    #[test]
    fn test_zero_runtime_is_unknown() {
        let details = TmdbDetails { runtime: Some(0), ..Default::default() };
        let enrichment: EnrichmentResult = details.into();
        assert!(enrichment.runtime_minutes.is_none());
    }
}
