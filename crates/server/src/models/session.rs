//! Session-related types.
//!
//! Types stored in the session for authentication state. Identity is always
//! carried here explicitly; no handler reads ambient global state.

use serde::{Deserialize, Serialize};

use productgen_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Account role, so admin checks don't hit the database.
    pub role: UserRole,
}

impl CurrentUser {
    /// True when this session belongs to an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for Bling OAuth state (CSRF protection).
    pub const BLING_OAUTH_STATE: &str = "bling_oauth_state";
}
