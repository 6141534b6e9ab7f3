pub mod api;
pub mod client;

pub use api::{poster_url, poster_url_with};
pub use client::TmdbClient;
