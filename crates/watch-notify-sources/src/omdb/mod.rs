pub mod client;

pub use client::{extract_ratings, OmdbClient, OmdbRating, OmdbResponse};
