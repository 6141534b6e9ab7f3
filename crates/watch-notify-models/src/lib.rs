pub mod enrichment;
pub mod media;
pub mod media_ids;
pub mod watch_event;

pub use enrichment::{EnrichmentResult, ExternalRatings};
pub use media::MediaKind;
pub use media_ids::CrossRefIds;
pub use watch_event::{EpisodeRef, WatchEvent};
