//! Administrator account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! pgen-cli admin create -e admin@example.com -n "Admin Name" -p "strong password"
//! ```
//!
//! There is no self-registration; the first administrator is created here,
//! and creates everyone else through the admin API.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use productgen_core::UserRole;
use productgen_server::services::auth::{AuthError, AuthService, DEFAULT_TRIAL_DAYS};

/// Errors that can occur while creating accounts.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Account validation or creation failed.
    #[error("Account creation error: {0}")]
    Auth(#[from] AuthError),
}

/// Create a new administrator account.
///
/// Administrator accounts are not subject to the trial gate; the trial
/// window is recorded but never enforced for them.
///
/// # Errors
///
/// Returns `AdminError::Auth` for an invalid email, a weak password, or a
/// duplicate email.
pub async fn create_admin(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| AdminError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating administrator account: {}", email);

    let auth = AuthService::new(&pool);
    let user = auth
        .create_user(
            email,
            password,
            Some(name),
            UserRole::Admin,
            DEFAULT_TRIAL_DAYS,
            Utc::now(),
        )
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}
