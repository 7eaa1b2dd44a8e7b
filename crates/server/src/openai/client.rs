//! OpenAI API client for chat completions.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::OpenAiConfig;

use super::error::{ApiErrorResponse, OpenAiError};
use super::types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API client.
///
/// Wraps the chat-completions endpoint for the extraction and ad-copy
/// features. Cheap to clone.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    model: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client.
    ///
    /// # Arguments
    ///
    /// * `config` - OpenAI configuration containing API key and model
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &OpenAiConfig) -> Self {
        let api_key = config.api_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .expect("Invalid API key for header"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(OpenAiClientInner {
                client,
                model: config.model.clone(),
            }),
        }
    }

    /// Request a completion in JSON mode and return the raw content string.
    ///
    /// The model is forced to answer with a single JSON object; callers
    /// deserialize it into their own shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response carries no
    /// content.
    #[instrument(skip(self, messages), fields(model = %self.inner.model))]
    pub async fn chat_json(&self, messages: Vec<ChatMessage>) -> Result<String, OpenAiError> {
        self.complete(messages, Some(ResponseFormat::json_object()))
            .await
    }

    /// Request a free-form text completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response carries no
    /// content.
    #[instrument(skip(self, messages), fields(model = %self.inner.model))]
    pub async fn chat_text(&self, messages: Vec<ChatMessage>) -> Result<String, OpenAiError> {
        self.complete(messages, None).await
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, OpenAiError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            messages,
            response_format,
        };

        let response = self
            .inner
            .client
            .post(OPENAI_API_URL)
            .json(&request)
            .send()
            .await?;

        let chat: ChatResponse = self.handle_response(response).await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OpenAiError::Parse("response carried no content".to_string()))
    }

    /// Handle a successful response.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ChatResponse, OpenAiError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| OpenAiError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(self.handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> OpenAiError {
        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return OpenAiError::RateLimited(retry_after);
        }

        // Check for unauthorized
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return OpenAiError::Unauthorized("Invalid API key".to_string());
        }

        // Try to parse API error response
        match response.text().await {
            Ok(body) => {
                if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                    OpenAiError::Api {
                        error_type: api_error
                            .error
                            .error_type
                            .or(api_error.error.code)
                            .unwrap_or_else(|| "unknown".to_string()),
                        message: api_error.error.message,
                    }
                } else {
                    OpenAiError::Api {
                        error_type: "unknown".to_string(),
                        message: body,
                    }
                }
            }
            Err(e) => OpenAiError::Http(e),
        }
    }
}
