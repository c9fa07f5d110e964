//! Metadata fetchers for the site's AJAX API
//!
//! Three lookups, all built on the shared [`FetchClient`](crate::fetch::FetchClient):
//! - artwork owner and title
//! - an artwork's image URLs
//! - a user's artwork IDs

mod fetchers;
pub mod types;

pub use fetchers::{ArtworkMetadata, PixivApi};
pub use types::ApiError;
