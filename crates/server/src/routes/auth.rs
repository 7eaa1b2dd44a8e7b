//! Authentication route handlers.
//!
//! JSON login/logout plus the current-profile endpoint. There is no
//! self-registration; accounts are provisioned by an administrator (see
//! `routes::admin_users`).

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{info, instrument};

use productgen_core::UserRole;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::session::CurrentUser;
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The user profile returned by login, `/api/auth/me`, and the admin list.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub trial_days_remaining: i64,
    pub trial_ends_at: DateTime<Utc>,
    pub bling_connected: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub(crate) fn from_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id.as_i32(),
            email: user.email.to_string(),
            name: user.name.clone(),
            role: user.role,
            trial_days_remaining: user.trial_days_remaining(now),
            trial_ends_at: user.trial.ends_at,
            bling_connected: user.bling_connected,
            created_at: user.created_at,
        }
    }
}

/// Login with email and password.
///
/// `POST /api/auth/login`
///
/// Non-admin accounts past their trial window are rejected with 403.
///
/// # Errors
///
/// Returns 401 for wrong credentials, 403 for an expired trial.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let auth = AuthService::new(state.pool());
    let now = Utc::now();

    let user = auth
        .login_with_password(&request.email, &request.password, now)
        .await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));

    info!(user_id = %user.id, "User logged in");
    Ok(Json(UserProfile::from_user(&user, now)))
}

/// Logout the current user.
///
/// `POST /api/auth/logout`
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<Json<Value>, AppError> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();

    Ok(Json(json!({ "success": true })))
}

/// Current user's profile.
///
/// `GET /api/auth/me`
///
/// # Errors
///
/// Returns 401 when not logged in; 404 when the account was deleted while
/// the session was still live.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<UserProfile>, AppError> {
    let auth = AuthService::new(state.pool());
    let user = auth.get_user(current.id).await?;

    Ok(Json(UserProfile::from_user(&user, Utc::now())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use productgen_core::{Email, TrialWindow, UserId};

    fn sample_user(now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(3),
            email: Email::parse("ana@example.com").unwrap(),
            name: Some("Ana".to_string()),
            role: UserRole::User,
            trial: TrialWindow::starting_now(now, 7),
            trial_active: true,
            bling_connected: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_reports_days_remaining() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
        let user = sample_user(now);

        let profile = UserProfile::from_user(&user, now);
        assert_eq!(profile.trial_days_remaining, 7);
        assert_eq!(profile.email, "ana@example.com");

        let later = now + chrono::Duration::days(10);
        let profile = UserProfile::from_user(&user, later);
        assert_eq!(profile.trial_days_remaining, 0);
    }

    #[test]
    fn test_login_request_debug_redacts_password() {
        let request = LoginRequest {
            email: "ana@example.com".to_string(),
            password: "hunter2-hunter2".to_string(),
        };

        let debug = format!("{request:?}");
        assert!(!debug.contains("hunter2"));
    }
}
