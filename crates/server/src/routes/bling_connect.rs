//! Bling account linking route handlers.
//!
//! Handles the OAuth flow for connecting a user's Bling account:
//! - Settings: store/read the per-account app credentials (client id/secret)
//! - Connect: redirect to Bling's authorization page with a CSRF state
//! - Callback: verify state, exchange the code, seal and persist tokens
//! - Disconnect: clear the whole credential pair
//!
//! Connect and callback are browser navigations, so failures redirect back
//! to the settings page with an `?error=` tag instead of answering JSON.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::bling::types::{self, TokenResponse};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::session::keys;
use crate::services::credentials::CredentialStore;
use crate::state::AppState;

/// Bling settings as shown back to the account owner.
///
/// Never carries the client secret or tokens.
#[derive(Debug, Serialize)]
pub struct BlingSettings {
    pub client_id: Option<String>,
    pub connected: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Request to save Bling app credentials.
#[derive(Deserialize)]
pub struct SaveSettingsRequest {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SaveSettingsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSettingsRequest")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Query parameters from the Bling OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Current Bling settings for the logged-in user.
///
/// `GET /api/settings/bling`
///
/// # Errors
///
/// Returns 500 if the stored credentials cannot be read.
pub async fn get_settings(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<BlingSettings>, AppError> {
    let store = CredentialStore::new(state.pool(), state.cipher());

    let settings = match store.load(current.id).await? {
        Some(creds) => BlingSettings {
            client_id: Some(creds.client_id),
            connected: creds.connected,
            token_expires_at: creds.token_expires_at,
        },
        None => BlingSettings {
            client_id: None,
            connected: false,
            token_expires_at: None,
        },
    };

    Ok(Json(settings))
}

/// Save Bling app credentials (client id + secret).
///
/// `POST /api/settings/bling`
///
/// The secret is sealed before it touches the database. Saving new app
/// credentials does not touch existing tokens; reconnect to rotate them.
///
/// # Errors
///
/// Returns 400 when either field is empty.
#[instrument(skip(state, current, request), fields(user_id = %current.id))]
pub async fn save_settings(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(request): Json<SaveSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    if request.client_id.trim().is_empty() || request.client_secret.trim().is_empty() {
        return Err(AppError::BadRequest(
            "client_id and client_secret are required".to_string(),
        ));
    }

    let store = CredentialStore::new(state.pool(), state.cipher());
    store
        .save_app_credentials(current.id, request.client_id.trim(), &request.client_secret)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Start the Bling OAuth flow.
///
/// `GET /api/bling/connect`
///
/// Requires saved app credentials. Generates a UUID state, stores it in the
/// session, and redirects to Bling's authorization page.
pub async fn connect(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
) -> Response {
    let store = CredentialStore::new(state.pool(), state.cipher());

    let creds = match store.load(current.id).await {
        Ok(Some(creds)) => creds,
        Ok(None) => {
            tracing::warn!(user_id = %current.id, "Connect attempted without app credentials");
            return Redirect::to("/settings?error=missing_credentials").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to load Bling credentials: {e}");
            return Redirect::to("/settings?error=credentials").into_response();
        }
    };

    let oauth_state = Uuid::new_v4().to_string();
    if let Err(e) = session.insert(keys::BLING_OAUTH_STATE, &oauth_state).await {
        tracing::error!("Failed to store OAuth state in session: {e}");
        return Redirect::to("/settings?error=session").into_response();
    }

    let redirect_uri = format!("{}/api/bling/callback", state.config().base_url);
    let auth_url = state
        .bling()
        .authorization_url(&creds.client_id, &redirect_uri, &oauth_state);

    Redirect::to(&auth_url).into_response()
}

/// Handle the Bling OAuth callback.
///
/// `GET /api/bling/callback?code=&state=`
///
/// Validates the state parameter against the session, exchanges the code,
/// and seals the token pair. Every path redirects back to settings.
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        tracing::warn!(user_id = %current.id, error = %error, "Bling OAuth denied");
        return Redirect::to("/settings?error=oauth_denied").into_response();
    }

    let Some(code) = query.code else {
        tracing::warn!("Bling OAuth callback missing code");
        return Redirect::to("/settings?error=missing_code").into_response();
    };

    // CSRF check: the state must match what connect stored in this session.
    let stored_state: Option<String> = session
        .get(keys::BLING_OAUTH_STATE)
        .await
        .ok()
        .flatten();

    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("Bling OAuth state mismatch");
        return Redirect::to("/settings?error=oauth_state").into_response();
    }

    // One-time use
    let _ = session.remove::<String>(keys::BLING_OAUTH_STATE).await;

    let store = CredentialStore::new(state.pool(), state.cipher());
    let creds = match store.load(current.id).await {
        Ok(Some(creds)) => creds,
        _ => {
            tracing::error!(user_id = %current.id, "App credentials vanished mid-flow");
            return Redirect::to("/settings?error=missing_credentials").into_response();
        }
    };

    // Must match the redirect_uri used in the authorization request
    let redirect_uri = format!("{}/api/bling/callback", state.config().base_url);
    let now = Utc::now();

    let token: TokenResponse = match state
        .bling()
        .exchange_code(&creds.client_id, &creds.client_secret, &code, &redirect_uri)
        .await
        .and_then(types::from_value)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to exchange Bling OAuth code: {e}");
            return Redirect::to("/settings?error=token_exchange").into_response();
        }
    };

    let expires_at = now + Duration::seconds(token.expires_in);
    if let Err(e) = store
        .save_tokens(
            current.id,
            &token.access_token,
            token.refresh_token.as_deref(),
            expires_at,
        )
        .await
    {
        tracing::error!("Failed to persist Bling tokens: {e}");
        return Redirect::to("/settings?error=token_storage").into_response();
    }

    tracing::info!(user_id = %current.id, "Bling account connected");
    Redirect::to("/settings?success=bling_connected").into_response()
}

/// Disconnect the Bling account.
///
/// `POST /api/bling/disconnect`
///
/// Clears the whole credential pair, including the saved app credentials.
///
/// # Errors
///
/// Returns 500 if the update fails.
pub async fn disconnect(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Value>, AppError> {
    let store = CredentialStore::new(state.pool(), state.cipher());
    store.clear(current.id).await?;

    tracing::info!(user_id = %current.id, "Bling account disconnected");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_settings_debug_redacts_secret() {
        let request = SaveSettingsRequest {
            client_id: "my-client".to_string(),
            client_secret: "super-secret-value".to_string(),
        };

        let debug = format!("{request:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("my-client"));
    }
}
