//! Bling ERP API client (OAuth v3).
//!
//! # Architecture
//!
//! - OAuth2 authorization-code flow against Bling's token endpoint; the
//!   credential pair travels in the form body, never in a URL
//! - REST calls under `/Api/v3` with bearer tokens
//! - Client methods return raw `serde_json::Value` payloads so the proxy
//!   route can relay them without reshaping; [`types`] has typed views for
//!   server-side flows
//!
//! # Example
//!
//! ```rust,ignore
//! use productgen_server::bling::BlingClient;
//!
//! let client = BlingClient::new(&config.bling);
//!
//! // Exchange the callback code for a token pair
//! let raw = client
//!     .exchange_code(&client_id, &client_secret, &code, &redirect_uri)
//!     .await?;
//! let token: TokenResponse = types::from_value(raw)?;
//!
//! // Call the REST API
//! let page = client.list_products(&token.access_token, 1, 100).await?;
//! ```

mod client;
pub mod types;

pub use client::BlingClient;

use thiserror::Error;

/// Errors that can occur when talking to the Bling API.
#[derive(Debug, Error)]
pub enum BlingError {
    /// HTTP transport failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bling answered with a non-success status. Carries the raw response
    /// body so callers can surface exactly what the ERP said.
    #[error("Bling API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Bling answered 2xx but the payload was not the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}
