use serde::{Deserialize, Serialize};

/// Identifiers that link a feed entry to the metadata sources.
///
/// `tmdb_id` drives enrichment, `imdb_id` drives the optional IMDb rating
/// lookup. Either may be missing; neither is required to announce an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CrossRefIds {
    pub trakt_id: Option<u64>,
    pub tmdb_id: Option<u64>,
    pub imdb_id: Option<String>,
}

impl CrossRefIds {
    /// TMDB id usable for a lookup (TMDB never issues id 0)
    pub fn secondary_id(&self) -> Option<u64> {
        self.tmdb_id.filter(|id| *id > 0)
    }

    /// IMDb id with the slashes Trakt sometimes includes removed
    pub fn imdb(&self) -> Option<&str> {
        self.imdb_id
            .as_deref()
            .map(|s| s.trim_matches('/'))
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.trakt_id.is_none() && self.secondary_id().is_none() && self.imdb().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_id_rejects_zero() {
        let ids = CrossRefIds {
            tmdb_id: Some(0),
            ..CrossRefIds::default()
        };
        assert_eq!(ids.secondary_id(), None);

        let ids = CrossRefIds {
            tmdb_id: Some(603),
            ..CrossRefIds::default()
        };
        assert_eq!(ids.secondary_id(), Some(603));
    }

    #[test]
    fn test_imdb_trims_slashes_and_blank() {
        let ids = CrossRefIds {
            imdb_id: Some("/tt0133093/".to_string()),
            ..CrossRefIds::default()
        };
        assert_eq!(ids.imdb(), Some("tt0133093"));

        let blank = CrossRefIds {
            imdb_id: Some(String::new()),
            ..CrossRefIds::default()
        };
        assert_eq!(blank.imdb(), None);
        assert!(blank.is_empty());
    }
}
