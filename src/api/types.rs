//! Wire shapes of the AJAX endpoints
//!
//! Only the fields the downloader reads are modeled.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Common `{error, message, body}` wrapper around every AJAX response
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub error: bool,

    #[serde(default)]
    pub message: String,

    /// Kept untyped: errored responses send `[]` or `{}` here
    #[serde(default)]
    pub body: Value,
}

/// Why an envelope yielded no usable body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API reported an error: {0}")]
    Reported(String),

    #[error("unexpected body shape: {0}")]
    Shape(#[from] serde_json::Error),
}

impl Envelope {
    /// Decodes the body, or returns the API's own error message
    pub fn into_body<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if self.error {
            let message = if self.message.is_empty() {
                "no details given".to_string()
            } else {
                self.message
            };
            return Err(ApiError::Reported(message));
        }
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Body of `/ajax/illust/{id}`
#[derive(Debug, Deserialize)]
pub struct IllustBody {
    #[serde(rename = "userId", default)]
    pub user_id: String,

    #[serde(rename = "userName", default)]
    pub user_name: String,

    #[serde(rename = "illustTitle", default)]
    pub illust_title: String,
}

/// One element of the `/ajax/illust/{id}/pages` body
#[derive(Debug, Deserialize)]
pub struct PageEntry {
    pub urls: PageUrls,
}

#[derive(Debug, Deserialize)]
pub struct PageUrls {
    pub original: String,
}

/// Body of `/ajax/user/{id}/profile/all`
#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    /// A map keyed by artwork ID, or `[]` for users without illustrations
    #[serde(default)]
    pub illusts: Value,
}
