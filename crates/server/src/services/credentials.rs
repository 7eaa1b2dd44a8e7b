//! Sealed storage for the per-user Bling credential pair.
//!
//! The client secret and OAuth tokens never touch the database in the clear:
//! they are sealed with AES-256-GCM under the `CREDENTIALS_KEY` master key,
//! each value as `nonce || ciphertext` in a single bytea column. Only this
//! module holds the cipher; the repository moves opaque bytes.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

use productgen_core::UserId;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::BlingCredentials;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Errors from sealing, opening, or persisting credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Master key is not 64 hex characters.
    #[error("credentials key must be 64 hex characters (32 bytes)")]
    InvalidKey,

    /// Encryption failed.
    #[error("failed to seal credential")]
    Seal,

    /// Decryption failed (wrong key or corrupted bytes).
    #[error("failed to open sealed credential")]
    Open,

    /// Sealed bytes are too short or not valid UTF-8 after opening.
    #[error("sealed credential malformed")]
    Malformed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// AES-256-GCM cipher for credential values.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Build the cipher from the 64-hex-char master key.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::InvalidKey` when the key is not 64 hex
    /// characters.
    pub fn new(master_key_hex: &SecretString) -> Result<Self, CredentialError> {
        let hex_str = master_key_hex.expose_secret();
        if hex_str.len() != 64 {
            return Err(CredentialError::InvalidKey);
        }

        let key_bytes = hex::decode(hex_str).map_err(|_| CredentialError::InvalidKey)?;
        let cipher =
            Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| CredentialError::InvalidKey)?;

        Ok(Self { cipher })
    }

    /// Seal a secret string into nonce-prefixed ciphertext.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Seal` when encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CredentialError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CredentialError::Seal)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open nonce-prefixed ciphertext back into the secret string.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Malformed` for truncated or non-UTF-8 input.
    /// Returns `CredentialError::Open` when decryption fails.
    pub fn open(&self, sealed: &[u8]) -> Result<String, CredentialError> {
        if sealed.len() <= NONCE_LEN {
            return Err(CredentialError::Malformed);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CredentialError::Open)?;

        String::from_utf8(plaintext).map_err(|_| CredentialError::Malformed)
    }
}

/// Load/save/clear the credential pair on the user row.
pub struct CredentialStore<'a> {
    users: UserRepository<'a>,
    cipher: &'a CredentialCipher,
}

impl<'a> CredentialStore<'a> {
    /// Create a new credential store.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cipher: &'a CredentialCipher) -> Self {
        Self {
            users: UserRepository::new(pool),
            cipher,
        }
    }

    /// Load and open the user's credential pair.
    ///
    /// Returns `None` when the user does not exist or has never saved app
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Open` when stored values cannot be opened
    /// (key rotation without re-sealing, corrupted rows).
    pub async fn load(&self, user_id: UserId) -> Result<Option<BlingCredentials>, CredentialError> {
        let Some(sealed) = self.users.get_sealed_credentials(user_id).await? else {
            return Ok(None);
        };

        let (Some(client_id), Some(secret_bytes)) =
            (sealed.bling_client_id, sealed.bling_client_secret)
        else {
            return Ok(None);
        };

        let client_secret = self.cipher.open(&secret_bytes)?;
        let access_token = sealed
            .bling_access_token
            .as_deref()
            .map(|b| self.cipher.open(b))
            .transpose()?;
        let refresh_token = sealed
            .bling_refresh_token
            .as_deref()
            .map(|b| self.cipher.open(b))
            .transpose()?;

        Ok(Some(BlingCredentials {
            client_id,
            client_secret,
            access_token,
            refresh_token,
            token_expires_at: sealed.bling_token_expires_at,
            connected: sealed.bling_connected,
        }))
    }

    /// Seal and store the app credential pair (client id + secret).
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Repository` wrapping `NotFound` when the
    /// user does not exist.
    pub async fn save_app_credentials(
        &self,
        user_id: UserId,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), CredentialError> {
        let sealed_secret = self.cipher.seal(client_secret)?;
        self.users
            .save_app_credentials(user_id, client_id, &sealed_secret)
            .await?;
        Ok(())
    }

    /// Seal and store a token pair, marking the account connected.
    ///
    /// `refresh_token` may be `None` when a refresh response omitted it; the
    /// stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Repository` wrapping `NotFound` when the
    /// user does not exist.
    pub async fn save_tokens(
        &self,
        user_id: UserId,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        let sealed_access = self.cipher.seal(access_token)?;
        let sealed_refresh = refresh_token.map(|t| self.cipher.seal(t)).transpose()?;

        self.users
            .save_tokens(user_id, &sealed_access, sealed_refresh.as_deref(), expires_at)
            .await?;
        Ok(())
    }

    /// Remove the whole credential pair and drop the connected flag.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Repository` if the update fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CredentialError> {
        self.users.clear_credentials(user_id).await?;
        Ok(())
    }

    /// Drop the connected flag but keep stored credentials.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Repository` if the update fails.
    pub async fn mark_disconnected(&self, user_id: UserId) -> Result<(), CredentialError> {
        self.users.mark_disconnected(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_cipher() -> CredentialCipher {
        let key = SecretString::from(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        );
        CredentialCipher::new(&key).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let cipher = test_cipher();
        let sealed = cipher.seal("bling-client-secret-123").unwrap();

        assert_ne!(sealed, b"bling-client-secret-123");
        assert!(sealed.len() > NONCE_LEN);
        assert_eq!(cipher.open(&sealed).unwrap(), "bling-client-secret-123");
    }

    #[test]
    fn test_seal_is_randomized() {
        let cipher = test_cipher();
        let a = cipher.seal("same secret").unwrap();
        let b = cipher.seal("same secret").unwrap();
        // Fresh nonce each time, so identical plaintexts differ at rest
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_rejects_truncated_input() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.open(&[0u8; NONCE_LEN]),
            Err(CredentialError::Malformed)
        ));
    }

    #[test]
    fn test_open_rejects_tampered_ciphertext() {
        let cipher = test_cipher();
        let mut sealed = cipher.seal("secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(matches!(cipher.open(&sealed), Err(CredentialError::Open)));
    }

    #[test]
    fn test_wrong_key_cannot_open() {
        let sealed = test_cipher().seal("secret").unwrap();

        let other = CredentialCipher::new(&SecretString::from(
            "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        ))
        .unwrap();
        assert!(matches!(other.open(&sealed), Err(CredentialError::Open)));
    }

    #[test]
    fn test_rejects_short_key() {
        let result = CredentialCipher::new(&SecretString::from("abcd"));
        assert!(matches!(result, Err(CredentialError::InvalidKey)));
    }

    #[test]
    fn test_rejects_non_hex_key() {
        let result = CredentialCipher::new(&SecretString::from(
            "zz0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        ));
        assert!(matches!(result, Err(CredentialError::InvalidKey)));
    }
}
