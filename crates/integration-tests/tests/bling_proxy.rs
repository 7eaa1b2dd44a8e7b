//! Integration tests for the Bling OAuth proxy endpoint.
//!
//! Drives `POST /api/bling` through the full router with the Bling side
//! played by a wiremock server: grant parameter mapping, response
//! relaying, validation short-circuits, and error envelope shape.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{any, body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use productgen_integration_tests::{test_app, test_config};

fn proxy_request(payload: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/bling")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// =============================================================================
// Validation: no upstream traffic on bad input
// =============================================================================

#[tokio::test]
async fn test_unknown_action_is_400_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({ "action": "deleteEverything" })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid action");

    server.verify().await;
}

#[tokio::test]
async fn test_missing_action_is_400() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({ "code": "abc123" })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid action");

    server.verify().await;
}

#[tokio::test]
async fn test_exchange_with_missing_fields_is_400() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "exchangeToken",
            "code": "abc123"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["error"],
        "missing required fields: code, clientId, clientSecret, redirectUri"
    );

    server.verify().await;
}

#[tokio::test]
async fn test_empty_strings_count_as_missing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "refreshToken",
            "refreshToken": "",
            "clientId": "cid",
            "clientSecret": "shh-secret"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["error"],
        "missing required fields: refreshToken, clientId, clientSecret"
    );

    server.verify().await;
}

#[tokio::test]
async fn test_api_request_with_missing_fields_is_400() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "apiRequest",
            "endpoint": "/produtos"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "missing required fields: endpoint, accessToken");

    server.verify().await;
}

#[tokio::test]
async fn test_unparseable_method_is_400() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "apiRequest",
            "endpoint": "/produtos",
            "accessToken": "t1",
            "method": "NOT A METHOD"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid method");

    server.verify().await;
}

// =============================================================================
// Token grants
// =============================================================================

#[tokio::test]
async fn test_exchange_token_maps_grant_and_relays_response() {
    let server = MockServer::start().await;
    let token = json!({
        "access_token": "at-1",
        "refresh_token": "rt-1",
        "expires_in": 21600,
        "token_type": "Bearer"
    });

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(wiremock::matchers::header(
            "content-type",
            "application/x-www-form-urlencoded",
        ))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("client_id=cid"))
        .and(body_string_contains("client_secret=shh-secret"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(token.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "exchangeToken",
            "code": "abc123",
            "clientId": "cid",
            "clientSecret": "shh-secret",
            "redirectUri": "https://app.example.com/cb"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, token);

    server.verify().await;
}

#[tokio::test]
async fn test_exchange_token_keeps_secret_out_of_headers_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at" })))
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    app.oneshot(proxy_request(&json!({
        "action": "exchangeToken",
        "code": "abc123",
        "clientId": "cid",
        "clientSecret": "shh-secret",
        "redirectUri": "https://app.example.com/cb"
    })))
    .await
    .expect("request should complete");

    let requests = server
        .received_requests()
        .await
        .expect("request recording is on");
    let upstream = requests.first().expect("one upstream call");

    assert!(!upstream.headers.contains_key("authorization"));
    assert!(upstream.url.query().unwrap_or("").is_empty());

    let form = String::from_utf8(upstream.body.clone()).expect("form body is UTF-8");
    assert!(form.contains("client_secret=shh-secret"));
}

#[tokio::test]
async fn test_refresh_token_sends_refresh_grant() {
    let server = MockServer::start().await;
    let token = json!({ "access_token": "at-2", "expires_in": 21600 });

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .and(body_string_contains("client_id=cid"))
        .and(body_string_contains("client_secret=shh-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "refreshToken",
            "refreshToken": "rt-1",
            "clientId": "cid",
            "clientSecret": "shh-secret"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, token);

    server.verify().await;
}

// =============================================================================
// API forwarding
// =============================================================================

#[tokio::test]
async fn test_api_request_get_forwards_bearer_and_query() {
    let server = MockServer::start().await;
    let listing = json!({ "data": [] });

    Mock::given(method("GET"))
        .and(path("/Api/v3/produtos"))
        .and(query_param("pagina", "1"))
        .and(query_param("limite", "100"))
        .and(wiremock::matchers::header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "apiRequest",
            "endpoint": "/produtos?pagina=1&limite=100",
            "accessToken": "t1"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, listing);

    server.verify().await;
}

#[tokio::test]
async fn test_api_request_get_never_attaches_a_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/v3/produtos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "apiRequest",
            "endpoint": "/produtos",
            "accessToken": "t1",
            "method": "get",
            "body": { "ignored": true }
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);

    let requests = server
        .received_requests()
        .await
        .expect("request recording is on");
    let upstream = requests.first().expect("one upstream call");
    assert!(upstream.body.is_empty());
}

#[tokio::test]
async fn test_api_request_post_forwards_body_verbatim() {
    let server = MockServer::start().await;
    let product = json!({ "nome": "Fone Bluetooth", "preco": 99.9, "tipo": "P" });
    let created = json!({ "data": { "id": 16_045_108 } });

    Mock::given(method("POST"))
        .and(path("/Api/v3/produtos"))
        .and(body_json(&product))
        .and(wiremock::matchers::header("authorization", "Bearer t1"))
        .and(wiremock::matchers::header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "apiRequest",
            "endpoint": "/produtos",
            "accessToken": "t1",
            "method": "POST",
            "body": product
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, created);

    server.verify().await;
}

// =============================================================================
// Upstream failures
// =============================================================================

#[tokio::test]
async fn test_upstream_error_is_500_with_details_in_development() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_token" })),
        )
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "development"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "refreshToken",
            "refreshToken": "rt-1",
            "clientId": "cid",
            "clientSecret": "shh-secret"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bling request failed");

    let details = body["details"].as_str().expect("details in development");
    assert!(details.contains("401"), "details should carry the status");
    assert!(
        details.contains("invalid_token"),
        "details should carry the raw upstream body"
    );
}

#[tokio::test]
async fn test_upstream_error_hides_details_in_production() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let app = test_app(test_config(&server.uri(), "production"));
    let response = app
        .oneshot(proxy_request(&json!({
            "action": "refreshToken",
            "refreshToken": "rt-1",
            "clientId": "cid",
            "clientSecret": "shh-secret"
        })))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bling request failed");
    assert!(body.get("details").is_none());
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_bare_options_answers_extension_probe() {
    let server = MockServer::start().await;
    let app = test_app(test_config(&server.uri(), "development"));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/bling")
        .body(Body::empty())
        .expect("request should build");

    let response = app.oneshot(request).await.expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .expect("allow-origin"),
        "*"
    );
    assert_eq!(
        headers
            .get("access-control-allow-methods")
            .expect("allow-methods"),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers
            .get("access-control-allow-headers")
            .expect("allow-headers"),
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_browser_preflight_is_accepted() {
    let server = MockServer::start().await;
    let app = test_app(test_config(&server.uri(), "development"));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/bling")
        .header(header::ORIGIN, "chrome-extension://abcdef")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("request should build");

    let response = app.oneshot(request).await.expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .expect("allow-origin"),
        "*"
    );
}
