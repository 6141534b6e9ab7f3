use serde::{Deserialize, Serialize};

/// What a history entry points at.
///
/// Trakt reports episodes together with their parent show, so anything that
/// carries a show is treated as a show episode and enriched through the
/// show's identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    ShowEpisode,
    Unknown,
}

impl MediaKind {
    /// Only movies and show episodes are announced
    pub fn is_announceable(&self) -> bool {
        matches!(self, MediaKind::Movie | MediaKind::ShowEpisode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::ShowEpisode => "show_episode",
            MediaKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_announceable() {
        assert!(MediaKind::Movie.is_announceable());
        assert!(MediaKind::ShowEpisode.is_announceable());
        assert!(!MediaKind::Unknown.is_announceable());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&MediaKind::ShowEpisode).unwrap();
        assert_eq!(json, "\"show_episode\"");
        let kind: MediaKind = serde_json::from_str("\"movie\"").unwrap();
        assert_eq!(kind, MediaKind::Movie);
    }
}
