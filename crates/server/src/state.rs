//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::bling::BlingClient;
use crate::config::ServerConfig;
use crate::openai::OpenAiClient;
use crate::services::credentials::{CredentialCipher, CredentialError};
use crate::services::imgbb::ImgbbClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and upstream clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    bling: BlingClient,
    cipher: CredentialCipher,
    openai: Option<OpenAiClient>,
    imgbb: Option<ImgbbClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The `OpenAI` and ImgBB clients are only constructed when their API
    /// keys are configured; the routes that need them answer 503 otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `CREDENTIALS_KEY` is not a valid AES-256 key.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, CredentialError> {
        let bling = BlingClient::new(&config.bling);
        let cipher = CredentialCipher::new(&config.credentials_key)?;
        let openai = config.openai().map(OpenAiClient::new);
        let imgbb = config.imgbb().map(ImgbbClient::new);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                bling,
                cipher,
                openai,
                imgbb,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Bling API client.
    #[must_use]
    pub fn bling(&self) -> &BlingClient {
        &self.inner.bling
    }

    /// Get a reference to the credential cipher.
    #[must_use]
    pub fn cipher(&self) -> &CredentialCipher {
        &self.inner.cipher
    }

    /// Get the `OpenAI` client, if extraction is configured.
    #[must_use]
    pub fn openai(&self) -> Option<&OpenAiClient> {
        self.inner.openai.as_ref()
    }

    /// Get the ImgBB client, if the upload relay is configured.
    #[must_use]
    pub fn imgbb(&self) -> Option<&ImgbbClient> {
        self.inner.imgbb.as_ref()
    }
}
