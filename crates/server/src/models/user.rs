//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use productgen_core::{Email, TrialWindow, UserId, UserRole};

/// A ProductGen account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name (defaults to the email local part at creation).
    pub name: Option<String>,
    /// Account role.
    pub role: UserRole,
    /// Trial window for this account. Admins are exempt from trial checks.
    pub trial: TrialWindow,
    /// Whether the trial is administratively active.
    pub trial_active: bool,
    /// Whether the account has completed the Bling OAuth flow.
    pub bling_connected: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whole days remaining in this account's trial, floored at zero.
    #[must_use]
    pub fn trial_days_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.trial.days_remaining_at(now)
    }
}

/// An account's Bling credential pair, decrypted for use.
///
/// Stored sealed (AES-256-GCM) at rest; this type only exists in memory for
/// the duration of a request. Never serialized into responses.
#[derive(Clone)]
pub struct BlingCredentials {
    /// OAuth client ID (not secret; shown back to the account owner).
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Current access token, if the OAuth flow has completed.
    pub access_token: Option<String>,
    /// Refresh token, if granted.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Connected flag from the user row.
    pub connected: bool,
}

impl std::fmt::Debug for BlingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlingCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_expires_at", &self.token_expires_at)
            .field("connected", &self.connected)
            .finish()
    }
}

impl BlingCredentials {
    /// True when either an access token or a refresh token is stored.
    ///
    /// The credential-pair invariant: `connected` implies this is true.
    #[must_use]
    pub const fn has_token_material(&self) -> bool {
        self.access_token.is_some() || self.refresh_token.is_some()
    }

    /// True when the access token is missing or expires within `skew` of `now`.
    #[must_use]
    pub fn token_stale_at(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        match self.token_expires_at {
            Some(expires_at) => now + skew >= expires_at,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials(expires_at: Option<DateTime<Utc>>) -> BlingCredentials {
        BlingCredentials {
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            access_token: Some("at".to_string()),
            refresh_token: Some("rt".to_string()),
            token_expires_at: expires_at,
            connected: true,
        }
    }

    #[test]
    fn test_token_stale_when_expiry_missing() {
        let creds = credentials(None);
        let now = Utc::now();
        assert!(creds.token_stale_at(now, chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_token_stale_within_skew_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid");
        // Expires 30s from now, skew is 60s: stale
        let creds = credentials(Some(now + chrono::Duration::seconds(30)));
        assert!(creds.token_stale_at(now, chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_token_fresh_outside_skew_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid");
        let creds = credentials(Some(now + chrono::Duration::seconds(3600)));
        assert!(!creds.token_stale_at(now, chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = credentials(None);
        let output = format!("{creds:?}");
        assert!(output.contains("cid"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("\"cs\""));
    }
}
