use serde::{Deserialize, Serialize};

/// Secondary metadata for an announced item.
///
/// Every field is optional: a partially filled result still produces an
/// announcement, and a missing result altogether renders as `N/A` fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentResult {
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub runtime_minutes: Option<u32>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub poster_path: Option<String>, // Artwork reference, resolved to a URL by the enricher
}

impl EnrichmentResult {
    /// Overview, ignoring the empty string TMDB returns for untranslated entries
    pub fn synopsis(&self) -> Option<&str> {
        self.overview
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Ratings from the optional tertiary lookup, as display strings
/// (`"8.7"` for IMDb, `"85%"` for the Tomatometer)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalRatings {
    pub imdb: Option<String>,
    pub tomatometer: Option<String>,
}

impl ExternalRatings {
    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tomatometer.is_none()
    }
}
