//! HTTP client for the Bling OAuth and REST endpoints.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::instrument;

use crate::config::BlingConfig;

use super::BlingError;

/// Bling API client.
///
/// Holds no credentials of its own; every call takes the tenant's client pair
/// or access token as arguments. Cheap to clone.
#[derive(Clone)]
pub struct BlingClient {
    inner: Arc<BlingClientInner>,
}

struct BlingClientInner {
    client: reqwest::Client,
    api_base: String,
    token_url: String,
    authorize_url: String,
}

impl BlingClient {
    /// Create a new Bling client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(config: &BlingConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(BlingClientInner {
                client,
                api_base: config.api_base.clone(),
                token_url: config.token_url.clone(),
                authorize_url: config.authorize_url.clone(),
            }),
        }
    }

    /// Generate the OAuth authorization URL.
    ///
    /// Redirect the user to this URL to begin the connect flow.
    #[must_use]
    pub fn authorization_url(&self, client_id: &str, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.inner.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// Returns the raw token payload exactly as Bling sent it.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when the token endpoint answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    #[instrument(skip(self, client_secret, code))]
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Value, BlingError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Obtain a fresh token pair from a refresh token.
    ///
    /// Returns the raw token payload exactly as Bling sent it.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when the token endpoint answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    #[instrument(skip(self, client_secret, refresh_token))]
    pub async fn refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<Value, BlingError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Forward an authenticated call to the REST API.
    ///
    /// `endpoint` is the path (plus query) under the API base, e.g.
    /// `/produtos?pagina=1&limite=100`. A body is only attached for non-GET
    /// methods.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when Bling answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    #[instrument(skip(self, access_token, body))]
    pub async fn api_request(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        access_token: &str,
        body: Option<&Value>,
    ) -> Result<Value, BlingError> {
        let url = format!("{}{}", self.inner.api_base, endpoint);

        let mut request = self
            .inner
            .client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body
            && method != reqwest::Method::GET
        {
            request = request.json(body);
        }

        handle_response(request.send().await?).await
    }

    /// List a page of products. Bling pages are 1-indexed, max 100 per page.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when Bling answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    pub async fn list_products(
        &self,
        access_token: &str,
        page: u32,
        limit: u32,
    ) -> Result<Value, BlingError> {
        let endpoint = format!("/produtos?pagina={page}&limite={limit}");
        self.api_request(reqwest::Method::GET, &endpoint, access_token, None)
            .await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when Bling answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    pub async fn create_product(
        &self,
        access_token: &str,
        product: &Value,
    ) -> Result<Value, BlingError> {
        self.api_request(reqwest::Method::POST, "/produtos", access_token, Some(product))
            .await
    }

    /// Update an existing product.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Api` when Bling answers non-2xx.
    /// Returns `BlingError::Http` when the request cannot complete.
    pub async fn update_product(
        &self,
        access_token: &str,
        product_id: &str,
        product: &Value,
    ) -> Result<Value, BlingError> {
        let endpoint = format!("/produtos/{product_id}");
        self.api_request(reqwest::Method::PUT, &endpoint, access_token, Some(product))
            .await
    }
}

/// Turn a Bling response into a raw JSON value, relaying error bodies verbatim.
async fn handle_response(response: reqwest::Response) -> Result<Value, BlingError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(BlingError::Api {
            status: status.as_u16(),
            body,
        });
    }

    // Some endpoints answer 2xx with an empty body
    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| BlingError::Parse(format!("invalid JSON: {e}")))
}
