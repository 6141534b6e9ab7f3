use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::media::MediaKind;
use crate::media_ids::CrossRefIds;

/// One entry of the watch-history feed, immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEvent {
    pub id: String, // Unique per feed, the dedup key
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<u32>,
    pub watched_at: DateTime<Utc>,
    pub ids: CrossRefIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeRef>,
}

/// Episode detail for show-episode events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRef {
    pub season: Option<u32>,
    pub number: Option<u32>,
    pub title: Option<String>,
}

impl EpisodeRef {
    /// `S01E02` style code, when both numbers are known
    pub fn code(&self) -> Option<String> {
        match (self.season, self.number) {
            (Some(season), Some(number)) => Some(format!("S{:02}E{:02}", season, number)),
            _ => None,
        }
    }
}

impl WatchEvent {
    /// Title as shown in announcements, with the episode code for episodes
    pub fn display_title(&self) -> String {
        match self.episode.as_ref().and_then(|e| e.code()) {
            Some(code) => format!("{} {}", self.title, code),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(episode: Option<EpisodeRef>) -> WatchEvent {
        WatchEvent {
            id: "9001".to_string(),
            kind: if episode.is_some() { MediaKind::ShowEpisode } else { MediaKind::Movie },
            title: "Severance".to_string(),
            year: Some(2022),
            watched_at: Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap(),
            ids: CrossRefIds::default(),
            episode,
        }
    }

    #[test]
    fn test_display_title_for_movie() {
        assert_eq!(event(None).display_title(), "Severance");
    }

    #[test]
    fn test_display_title_for_episode() {
        let ep = EpisodeRef { season: Some(2), number: Some(7), title: Some("Chikhai Bardo".to_string()) };
        assert_eq!(event(Some(ep)).display_title(), "Severance S02E07");
    }

    #[test]
    fn test_display_title_without_numbers() {
        let ep = EpisodeRef { season: None, number: Some(7), title: None };
        assert_eq!(event(Some(ep)).display_title(), "Severance");
    }
}
