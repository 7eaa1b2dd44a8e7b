//! Administrator user-management route handlers.
//!
//! Accounts are provisioned here (no self-registration). The first
//! administrator is seeded by `pgen-cli admin create`; after that, admins
//! manage everyone else through these endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use productgen_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::user::User;
use crate::routes::auth::UserProfile;
use crate::services::auth::{AuthService, DEFAULT_TRIAL_DAYS};
use crate::state::AppState;

/// Request to create a user account.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trial_days: Option<i64>,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("trial_days", &self.trial_days)
            .finish()
    }
}

/// List every account with trial and connection status.
///
/// `GET /api/admin/users`
///
/// # Errors
///
/// Returns 403 for non-admins, 500 on database failure.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let repo = UserRepository::new(state.pool());
    let now = Utc::now();

    let users = repo.list_all().await?;
    let profiles = users
        .iter()
        .map(|user| UserProfile::from_user(user, now))
        .collect();

    Ok(Json(profiles))
}

/// Create a user account with a fresh trial.
///
/// `POST /api/admin/users`
///
/// # Errors
///
/// Returns 400 for an invalid email, weak password, or non-positive
/// `trial_days`; 409 when the email is already registered.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let trial_days = request.trial_days.unwrap_or(DEFAULT_TRIAL_DAYS);
    if trial_days < 1 {
        return Err(AppError::BadRequest(
            "trial_days must be at least 1".to_string(),
        ));
    }

    let auth = AuthService::new(state.pool());
    let now = Utc::now();

    let user = auth
        .create_user(
            &request.email,
            &request.password,
            request.name.as_deref(),
            UserRole::User,
            trial_days,
            now,
        )
        .await?;

    info!(user_id = %user.id, "User account created");
    Ok((StatusCode::CREATED, Json(UserProfile::from_user(&user, now))))
}

/// Delete a user account.
///
/// `DELETE /api/admin/users/{id}`
///
/// Administrator accounts cannot be deleted through the API; demote or
/// remove them with operator tooling instead.
///
/// # Errors
///
/// Returns 403 when the target is an admin, 404 when the account does not
/// exist.
#[instrument(skip(state, admin), fields(admin_id = %admin.id, user_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Value>, AppError> {
    let repo = UserRepository::new(state.pool());

    let target = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    ensure_deletable(&target)?;

    if !repo.delete(id).await? {
        return Err(AppError::NotFound("user".to_string()));
    }

    info!(user_id = %id, "User account deleted");
    Ok(Json(json!({ "success": true })))
}

/// Administrator rows are never deletable through the API.
fn ensure_deletable(target: &User) -> Result<(), AppError> {
    if target.role.is_admin() {
        return Err(AppError::Forbidden(
            "administrator accounts cannot be deleted".to_string(),
        ));
    }
    Ok(())
}
