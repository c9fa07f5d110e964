//! Read-only metadata lookups
//!
//! Each lookup logs what happened and collapses every failure (transport,
//! status, decode, API-reported) into an absent or empty result. Resilience
//! lives in the [`FetchClient`]; nothing is retried here.

use crate::api::types::{ApiError, Envelope, IllustBody, PageEntry, ProfileBody};
use crate::fetch::{FetchClient, FetchError};
use serde_json::Value;

/// Owner and title of one artwork
///
/// Only produced when all three fields resolved to non-empty values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkMetadata {
    pub user_id: String,
    pub user_name: String,
    pub title: String,
}

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Client for the three AJAX endpoints the downloader consumes
#[derive(Debug, Clone)]
pub struct PixivApi {
    client: FetchClient,
    base_url: String,
}

impl PixivApi {
    /// # Arguments
    ///
    /// * `client` - Shared fetch client (carries headers and session cookie)
    /// * `base_url` - Site root, e.g. `https://www.pixiv.net`
    pub fn new(client: FetchClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    fn artwork_url(&self, artwork_id: &str) -> String {
        format!("{}/ajax/illust/{}", self.base_url, artwork_id)
    }

    fn pages_url(&self, artwork_id: &str) -> String {
        format!("{}/ajax/illust/{}/pages", self.base_url, artwork_id)
    }

    fn profile_url(&self, user_id: &str) -> String {
        format!("{}/ajax/user/{}/profile/all", self.base_url, user_id)
    }

    async fn lookup<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, LookupError> {
        let envelope: Envelope = self.client.get_json(url).await?;
        Ok(envelope.into_body()?)
    }

    /// Resolves an artwork's owner and title
    ///
    /// Returns `None` if the request fails, the API reports an error, the
    /// body cannot be decoded, or any of the three fields is empty.
    pub async fn fetch_artwork_info(&self, artwork_id: &str) -> Option<ArtworkMetadata> {
        let url = self.artwork_url(artwork_id);
        tracing::debug!("Requesting details of artwork {}", artwork_id);

        match self.lookup::<IllustBody>(&url).await {
            Ok(body) => {
                if body.user_id.is_empty() || body.user_name.is_empty() || body.illust_title.is_empty() {
                    tracing::warn!("Artwork {} details are incomplete", artwork_id);
                    return None;
                }
                tracing::info!("Fetched details of artwork {}", artwork_id);
                Some(ArtworkMetadata {
                    user_id: body.user_id,
                    user_name: body.user_name,
                    title: body.illust_title,
                })
            }
            Err(LookupError::Api(e)) => {
                tracing::warn!("Artwork {} lookup failed: {}", artwork_id, e);
                None
            }
            Err(LookupError::Fetch(e)) => {
                tracing::error!("Request error: {}", e);
                None
            }
        }
    }

    /// Lists the original-resolution image URLs of an artwork, in page order
    ///
    /// Returns an empty list on any failure.
    pub async fn fetch_image_urls(&self, artwork_id: &str) -> Vec<String> {
        let url = self.pages_url(artwork_id);
        tracing::debug!("Requesting image URLs of artwork {}", artwork_id);

        match self.lookup::<Vec<PageEntry>>(&url).await {
            Ok(pages) => {
                let urls: Vec<String> = pages.into_iter().map(|p| p.urls.original).collect();
                tracing::info!("Fetched {} image URLs of artwork {}", urls.len(), artwork_id);
                urls
            }
            Err(LookupError::Api(e)) => {
                tracing::warn!("Image URLs of artwork {} unavailable: {}", artwork_id, e);
                Vec::new()
            }
            Err(LookupError::Fetch(e)) => {
                tracing::error!("Request error: {}", e);
                Vec::new()
            }
        }
    }

    /// Lists the IDs of every illustration a user owns
    ///
    /// IDs come back sorted by the JSON map's key order, so repeated calls
    /// against the same data agree. Returns an empty list if the user has no
    /// works, the body has an unexpected shape, or the call fails.
    pub async fn fetch_user_artworks(&self, user_id: &str) -> Vec<String> {
        let url = self.profile_url(user_id);
        tracing::info!("Requesting works of user {}", user_id);

        let body = match self.lookup::<ProfileBody>(&url).await {
            Ok(body) => body,
            Err(LookupError::Api(e)) => {
                tracing::error!("Could not read works of user {}: {}", user_id, e);
                return Vec::new();
            }
            Err(LookupError::Fetch(e)) => {
                tracing::error!("Request error: {}", e);
                return Vec::new();
            }
        };

        match body.illusts {
            Value::Object(map) => {
                let ids: Vec<String> = map.into_iter().map(|(id, _)| id).collect();
                if ids.is_empty() {
                    tracing::warn!("User {} has no works", user_id);
                } else {
                    tracing::info!("Found {} works of user {}", ids.len(), user_id);
                }
                ids
            }
            Value::Array(items) if items.is_empty() => {
                tracing::warn!("User {} has no works", user_id);
                Vec::new()
            }
            other => {
                tracing::warn!(
                    "Works of user {} have an unexpected shape: {}",
                    user_id,
                    shape_name(&other)
                );
                Vec::new()
            }
        }
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
