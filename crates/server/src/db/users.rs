//! User repository for database operations.
//!
//! Covers accounts, trials, and the sealed Bling credential pair. Credential
//! bytes go in and out of here still sealed; the credentials service owns the
//! cipher.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use productgen_core::{Email, TrialWindow, UserId, UserRole};

use super::RepositoryError;
use crate::models::user::User;

/// Full user row as stored.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: Option<String>,
    password_hash: String,
    role: UserRole,
    trial_started_at: DateTime<Utc>,
    trial_ends_at: DateTime<Utc>,
    trial_active: bool,
    bling_connected: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            email,
            name: self.name,
            role: self.role,
            trial: TrialWindow {
                started_at: self.trial_started_at,
                ends_at: self.trial_ends_at,
            },
            trial_active: self.trial_active,
            bling_connected: self.bling_connected,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Sealed Bling credential pair as stored on the user row.
///
/// Byte columns hold AES-256-GCM ciphertext (nonce-prefixed); only the
/// credentials service can open them.
#[derive(Debug, sqlx::FromRow)]
pub struct SealedCredentials {
    pub bling_client_id: Option<String>,
    pub bling_client_secret: Option<Vec<u8>>,
    pub bling_access_token: Option<Vec<u8>>,
    pub bling_refresh_token: Option<Vec<u8>>,
    pub bling_token_expires_at: Option<DateTime<Utc>>,
    pub bling_connected: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user together with their password hash, for login verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(r) => {
                let hash = r.password_hash.clone();
                Ok(Some((r.into_user()?, hash)))
            }
            None => Ok(None),
        }
    }

    /// Create a new user with a fresh trial window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
        role: UserRole,
        trial: &TrialWindow,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, name, password_hash, role, trial_started_at, trial_ends_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .bind(role)
        .bind(trial.started_at)
        .bind(trial.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_user()
    }

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Delete a user.
    ///
    /// Returns `false` when no such user existed. Owned products are removed
    /// by the `ON DELETE CASCADE` constraint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Bling credential pair
    // =========================================================================

    /// Fetch the sealed credential pair for a user.
    ///
    /// Returns `None` when the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_sealed_credentials(
        &self,
        id: UserId,
    ) -> Result<Option<SealedCredentials>, RepositoryError> {
        let row = sqlx::query_as::<_, SealedCredentials>(
            r"
            SELECT bling_client_id, bling_client_secret, bling_access_token,
                   bling_refresh_token, bling_token_expires_at, bling_connected
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Store the account's Bling app credentials (client id + sealed secret).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save_app_credentials(
        &self,
        id: UserId,
        client_id: &str,
        sealed_secret: &[u8],
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET bling_client_id = $2, bling_client_secret = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(client_id)
        .bind(sealed_secret)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Store a fresh token pair and mark the account connected.
    ///
    /// A refresh response may omit a new refresh token; passing `None` keeps
    /// the previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save_tokens(
        &self,
        id: UserId,
        sealed_access: &[u8],
        sealed_refresh: Option<&[u8]>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET bling_access_token = $2,
                bling_refresh_token = COALESCE($3, bling_refresh_token),
                bling_token_expires_at = $4,
                bling_connected = TRUE,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(sealed_access)
        .bind(sealed_refresh)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Clear the entire credential pair and the connected flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_credentials(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET bling_client_id = NULL,
                bling_client_secret = NULL,
                bling_access_token = NULL,
                bling_refresh_token = NULL,
                bling_token_expires_at = NULL,
                bling_connected = FALSE,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Drop the connected flag without touching stored credentials.
    ///
    /// Used when a token refresh fails and the account must reconnect.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_disconnected(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET bling_connected = FALSE, updated_at = now() WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
