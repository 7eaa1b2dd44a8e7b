//! Bling integration proxy endpoint.
//!
//! `POST /api/bling` relays OAuth token grants and REST calls to Bling on
//! behalf of browser-held integrations, which cannot call Bling directly
//! (CORS) and must not embed client secrets. The endpoint is stateless: it
//! never persists credentials, never retries, and makes exactly one outbound
//! call per invocation. Validation failures answer 400 without touching the
//! network.
//!
//! This endpoint deliberately bypasses `AppError`; its error envelope is
//! part of the wire contract (`{error}` on 400, `{error, details?}` on 500,
//! `details` only outside production).

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::bling::BlingError;
use crate::state::AppState;

/// Proxy request body. Everything except `action` is action-specific.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// `exchangeToken`, `refreshToken`, or `apiRequest`.
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// HTTP method for `apiRequest`; defaults to GET.
    #[serde(default)]
    pub method: Option<String>,
    /// JSON body for `apiRequest`; dropped for GET.
    #[serde(default)]
    pub body: Option<Value>,
}

impl std::fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("action", &self.action)
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Errors from the proxy endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Request named an action the proxy does not support.
    #[error("invalid action")]
    UnknownAction,

    /// Required fields are missing/empty, or a field value is unusable.
    #[error("{0}")]
    Validation(&'static str),

    /// The outbound call to Bling failed.
    #[error(transparent)]
    Bling(#[from] BlingError),
}

/// Handle `POST /api/bling`.
#[instrument(skip(state, request), fields(action = %request.action))]
pub async fn handle(State(state): State<AppState>, Json(request): Json<ProxyRequest>) -> Response {
    let production = state.config().is_production();

    match dispatch(&state, &request).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(&err, production),
    }
}

/// Handle `OPTIONS /api/bling`.
///
/// Browser preflights with an `Origin` header are answered by the CORS
/// layer; this covers bare OPTIONS probes with the same headers.
pub async fn options() -> Response {
    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type, Authorization"),
            ),
        ],
    )
        .into_response()
}

async fn dispatch(state: &AppState, request: &ProxyRequest) -> Result<Value, ProxyError> {
    match request.action.as_str() {
        "exchangeToken" => exchange_token(state, request).await,
        "refreshToken" => refresh_token(state, request).await,
        "apiRequest" => api_request(state, request).await,
        _ => Err(ProxyError::UnknownAction),
    }
}

async fn exchange_token(state: &AppState, request: &ProxyRequest) -> Result<Value, ProxyError> {
    let (Some(code), Some(client_id), Some(client_secret), Some(redirect_uri)) = (
        require(&request.code),
        require(&request.client_id),
        require(&request.client_secret),
        require(&request.redirect_uri),
    ) else {
        return Err(ProxyError::Validation(
            "missing required fields: code, clientId, clientSecret, redirectUri",
        ));
    };

    Ok(state
        .bling()
        .exchange_code(client_id, client_secret, code, redirect_uri)
        .await?)
}

async fn refresh_token(state: &AppState, request: &ProxyRequest) -> Result<Value, ProxyError> {
    let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
        require(&request.refresh_token),
        require(&request.client_id),
        require(&request.client_secret),
    ) else {
        return Err(ProxyError::Validation(
            "missing required fields: refreshToken, clientId, clientSecret",
        ));
    };

    Ok(state
        .bling()
        .refresh_token(client_id, client_secret, refresh_token)
        .await?)
}

async fn api_request(state: &AppState, request: &ProxyRequest) -> Result<Value, ProxyError> {
    let (Some(endpoint), Some(access_token)) = (
        require(&request.endpoint),
        require(&request.access_token),
    ) else {
        return Err(ProxyError::Validation(
            "missing required fields: endpoint, accessToken",
        ));
    };

    let method = parse_method(request.method.as_deref())?;

    Ok(state
        .bling()
        .api_request(method, endpoint, access_token, request.body.as_ref())
        .await?)
}

/// Present and non-empty, or `None`.
fn require(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Parse the request method, defaulting to GET.
fn parse_method(method: Option<&str>) -> Result<Method, ProxyError> {
    match method.filter(|m| !m.is_empty()) {
        None => Ok(Method::GET),
        Some(name) => Method::from_bytes(name.to_uppercase().as_bytes())
            .map_err(|_| ProxyError::Validation("invalid method")),
    }
}

fn error_response(err: &ProxyError, production: bool) -> Response {
    match err {
        ProxyError::UnknownAction | ProxyError::Validation(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        ProxyError::Bling(source) => {
            warn!(error = %source, "Bling proxy upstream call failed");

            let mut body = json!({ "error": "Bling request failed" });
            if !production && let Some(object) = body.as_object_mut() {
                object.insert("details".to_string(), Value::String(source.to_string()));
            }

            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_defaults_to_get() {
        assert_eq!(parse_method(None).unwrap(), Method::GET);
        assert_eq!(parse_method(Some("")).unwrap(), Method::GET);
    }

    #[test]
    fn test_parse_method_uppercases() {
        assert_eq!(parse_method(Some("put")).unwrap(), Method::PUT);
        assert_eq!(parse_method(Some("Delete")).unwrap(), Method::DELETE);
    }

    #[test]
    fn test_parse_method_rejects_garbage() {
        assert!(matches!(
            parse_method(Some("NOT A METHOD")),
            Err(ProxyError::Validation("invalid method"))
        ));
    }

    #[test]
    fn test_require_filters_empty() {
        assert_eq!(require(&Some("value".to_string())), Some("value"));
        assert_eq!(require(&Some(String::new())), None);
        assert_eq!(require(&None), None);
    }

    #[test]
    fn test_validation_errors_are_400() {
        let response = error_response(&ProxyError::UnknownAction, false);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&ProxyError::Validation("missing required fields: x"), true);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_errors_are_500() {
        let err = ProxyError::Bling(BlingError::Api {
            status: 401,
            body: "invalid_token".to_string(),
        });

        let response = error_response(&err, true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_debug_omits_secrets() {
        let request = ProxyRequest {
            action: "apiRequest".to_string(),
            code: None,
            client_id: None,
            client_secret: Some("s3cret".to_string()),
            redirect_uri: None,
            refresh_token: None,
            endpoint: Some("/produtos".to_string()),
            access_token: Some("t0ken".to_string()),
            method: Some("GET".to_string()),
            body: None,
        };

        let debug = format!("{request:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("t0ken"));
        assert!(debug.contains("apiRequest"));
    }
}
