//! ImgBB image hosting client.
//!
//! Uploads base64-encoded images and returns the hosted URL. Configured by
//! `IMGBB_API_KEY`; when the key is absent the upload route answers 503.

use reqwest::Client;
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ImgbbConfig;

/// ImgBB upload endpoint.
const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

/// Errors that can occur when uploading an image.
#[derive(Debug, thiserror::Error)]
pub enum ImgbbError {
    /// Request failed (network, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ImgBB returned a non-success status.
    #[error("ImgBB error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the ImgBB upload API.
#[derive(Clone)]
pub struct ImgbbClient {
    client: Client,
    api_key: SecretString,
}

impl std::fmt::Debug for ImgbbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgbbClient")
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

impl ImgbbClient {
    /// Create a new ImgBB client.
    #[must_use]
    pub fn new(config: &ImgbbConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
        }
    }

    /// Upload a base64-encoded image and return its hosted URL.
    ///
    /// Accepts either a bare base64 string or a full `data:image/...;base64,`
    /// URI; the prefix is stripped before upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, ImgBB rejects the upload, or
    /// the response cannot be parsed.
    #[instrument(skip(self, image_base64))]
    pub async fn upload(&self, image_base64: &str) -> Result<String, ImgbbError> {
        let image = strip_data_uri_prefix(image_base64);

        let form = Form::new()
            .text("key", self.api_key.expose_secret().to_string())
            .text("image", image.to_string());

        let response = self
            .client
            .post(IMGBB_UPLOAD_URL)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImgbbError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImgbbError::Parse(e.to_string()))?;

        debug!("Image uploaded to ImgBB");
        Ok(parsed.data.url)
    }
}

/// Drop a `data:image/...;base64,` prefix when present.
fn strip_data_uri_prefix(image: &str) -> &str {
    if image.starts_with("data:") {
        image.split_once(";base64,").map_or(image, |(_, rest)| rest)
    } else {
        image
    }
}
