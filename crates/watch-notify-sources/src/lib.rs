pub mod error;
pub mod factory;
pub mod http;
pub mod omdb;
pub mod telegram;
pub mod tmdb;
pub mod traits;
pub mod trakt;

pub use error::{DispatchError, SourceError};
pub use factory::SourceSet;
pub use omdb::OmdbClient;
pub use telegram::TelegramClient;
pub use tmdb::{TmdbClient, poster_url};
pub use traits::{Enricher, HistorySource, MessageTransport, RatingsProvider};
pub use trakt::TraktClient;
