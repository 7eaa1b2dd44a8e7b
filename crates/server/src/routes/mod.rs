//! HTTP route handlers for the API server.
//!
//! # Route Structure
//!
//! ```text
//! # Bling OAuth proxy (no session required)
//! POST    /api/bling                - Token exchange / refresh / API forwarding
//! OPTIONS /api/bling                - CORS preflight
//!
//! # Auth
//! POST /api/auth/login              - Email/password login
//! POST /api/auth/logout             - End session
//! GET  /api/auth/me                 - Current user profile
//!
//! # Bling account (requires auth)
//! GET  /api/settings/bling          - Stored Bling app credentials
//! POST /api/settings/bling          - Save Bling app credentials
//! GET  /api/bling/connect           - Redirect to Bling OAuth consent
//! GET  /api/bling/callback          - Handle OAuth callback
//! POST /api/bling/disconnect        - Drop stored tokens
//!
//! # Products (requires auth, owner-scoped)
//! GET    /api/products              - List products
//! POST   /api/products              - Create product
//! GET    /api/products/{id}         - Product detail
//! PUT    /api/products/{id}         - Update product
//! DELETE /api/products/{id}         - Delete product
//! POST   /api/products/import       - Pull products from Bling
//! POST   /api/products/{id}/export  - Push product to Bling
//!
//! # AI extraction (requires auth)
//! POST /api/extract/image           - Extract listing data from a photo
//! POST /api/extract/url             - Extract listing data from a URL
//! POST /api/ads/generate            - Generate ad copy
//!
//! # Uploads (requires auth)
//! POST /api/uploads/images          - Host a base64 image, returns URL
//!
//! # Admin (requires admin role)
//! GET    /api/admin/users           - List accounts
//! POST   /api/admin/users           - Create account
//! DELETE /api/admin/users/{id}      - Delete account
//! ```

pub mod admin_users;
pub mod auth;
pub mod bling_connect;
pub mod extract;
pub mod products;
pub mod proxy;
pub mod uploads;

use axum::{
    Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the Bling account routes router (credentials and OAuth).
pub fn bling_account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/settings/bling",
            get(bling_connect::get_settings).post(bling_connect::save_settings),
        )
        .route("/bling/connect", get(bling_connect::connect))
        .route("/bling/callback", get(bling_connect::callback))
        .route("/bling/disconnect", post(bling_connect::disconnect))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/import", post(products::import))
        .route(
            "/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/export", post(products::export))
}

/// Create the AI extraction routes router.
pub fn extraction_routes() -> Router<AppState> {
    Router::new()
        .route("/extract/image", post(extract::from_image))
        .route("/extract/url", post(extract::from_url))
        .route("/ads/generate", post(extract::generate_ad))
}

/// Create the admin user management routes router.
pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_users::list).post(admin_users::create))
        .route("/{id}", delete(admin_users::delete))
}

/// CORS policy for the API. The browser extension's origin cannot be
/// enumerated, so any origin may call.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/api", api_routes()).layer(cors_layer())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Bling OAuth proxy. Bare OPTIONS (no preflight headers) is answered
        // by the handler itself; browser preflights are handled by the CORS
        // layer.
        .route("/bling", post(proxy::handle).options(proxy::options))
        .merge(bling_account_routes())
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/admin/users", admin_user_routes())
        .merge(extraction_routes())
        .route("/uploads/images", post(uploads::upload_image))
}
