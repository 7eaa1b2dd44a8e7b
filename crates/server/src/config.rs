//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BASE_URL` - Public URL of this deployment (used for OAuth redirects)
//! - `CREDENTIALS_KEY` - AES-256 master key for sealing ERP credentials at
//!   rest (64 hex characters, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `ENVIRONMENT` - `development` or `production` (default: development);
//!   gates error detail exposure on the ERP proxy endpoint
//! - `BLING_API_BASE` - Bling REST base URL (default: public v3 endpoint)
//! - `BLING_TOKEN_URL` - Bling OAuth token URL
//! - `BLING_AUTHORIZE_URL` - Bling OAuth authorize URL
//! - `OPENAI_API_KEY` - `OpenAI` API key (enables product-data extraction)
//! - `IMGBB_API_KEY` - ImgBB API key (enables image upload relay)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const CREDENTIALS_KEY_BYTES: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_BLING_API_BASE: &str = "https://api.bling.com.br/Api/v3";
const DEFAULT_BLING_TOKEN_URL: &str = "https://www.bling.com.br/Api/v3/oauth/token";
const DEFAULT_BLING_AUTHORIZE_URL: &str = "https://www.bling.com.br/Api/v3/oauth/authorize";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this deployment
    pub base_url: String,
    /// Deployment environment (`development` or `production`)
    pub environment: String,
    /// Master key for sealing ERP credentials at rest (64 hex chars)
    pub credentials_key: SecretString,
    /// Bling ERP endpoint configuration
    pub bling: BlingConfig,
    /// `OpenAI` configuration (optional, enables extraction routes)
    pub openai: Option<OpenAiConfig>,
    /// ImgBB configuration (optional, enables image upload relay)
    pub imgbb: Option<ImgbbConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Bling ERP endpoint configuration.
///
/// Contains no secrets; per-account client credentials live in the database.
/// The URLs are overridable so tests can point the client at a local double.
#[derive(Debug, Clone)]
pub struct BlingConfig {
    /// REST API base URL (e.g., <https://api.bling.com.br/Api/v3>)
    pub api_base: String,
    /// OAuth token endpoint URL
    pub token_url: String,
    /// OAuth authorize endpoint URL
    pub authorize_url: String,
}

/// `OpenAI` API configuration for product-data extraction.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// `OpenAI` API key
    pub api_key: SecretString,
    /// Model ID (e.g., gpt-4o)
    pub model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// ImgBB image hosting configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ImgbbConfig {
    /// ImgBB API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for ImgbbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgbbConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("BASE_URL")?;
        let environment = get_env_or_default("ENVIRONMENT", "development");

        let credentials_key = get_validated_secret("CREDENTIALS_KEY")?;
        validate_credentials_key(&credentials_key, "CREDENTIALS_KEY")?;

        let bling = BlingConfig::from_env();
        let openai = OpenAiConfig::from_env();
        let imgbb = ImgbbConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            credentials_key,
            bling,
            openai,
            imgbb,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns true when running in production.
    ///
    /// Gates exposure of error details on the ERP proxy endpoint.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Returns a reference to the `OpenAI` configuration, if available.
    ///
    /// Returns `None` if `OPENAI_API_KEY` was not set, which disables the
    /// extraction and ad-generation routes.
    #[must_use]
    pub const fn openai(&self) -> Option<&OpenAiConfig> {
        self.openai.as_ref()
    }

    /// Returns a reference to the ImgBB configuration, if available.
    #[must_use]
    pub const fn imgbb(&self) -> Option<&ImgbbConfig> {
        self.imgbb.as_ref()
    }
}

impl BlingConfig {
    fn from_env() -> Self {
        Self {
            api_base: get_env_or_default("BLING_API_BASE", DEFAULT_BLING_API_BASE),
            token_url: get_env_or_default("BLING_TOKEN_URL", DEFAULT_BLING_TOKEN_URL),
            authorize_url: get_env_or_default("BLING_AUTHORIZE_URL", DEFAULT_BLING_AUTHORIZE_URL),
        }
    }
}

impl OpenAiConfig {
    /// Load `OpenAI` configuration from environment.
    ///
    /// Returns `None` if `OPENAI_API_KEY` is not set (extraction disabled).
    fn from_env() -> Option<Self> {
        get_optional_env("OPENAI_API_KEY").map(|key| {
            // Validate the key if present
            if let Err(e) = validate_secret_strength(&key, "OPENAI_API_KEY") {
                tracing::warn!("OPENAI_API_KEY validation warning: {e}");
            }
            Self {
                api_key: SecretString::from(key),
                model: get_env_or_default("OPENAI_MODEL", "gpt-4o"),
            }
        })
    }
}

impl ImgbbConfig {
    /// Load ImgBB configuration from environment.
    ///
    /// Returns `None` if `IMGBB_API_KEY` is not set (upload relay disabled).
    fn from_env() -> Option<Self> {
        get_optional_env("IMGBB_API_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "IMGBB_API_KEY") {
                tracing::warn!("IMGBB_API_KEY validation warning: {e}");
            }
            Self {
                api_key: SecretString::from(key),
            }
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the credentials master key decodes to exactly 32 bytes.
fn validate_credentials_key(key: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = key.expose_secret();
    let decoded = hex::decode(value).map_err(|_| {
        ConfigError::InsecureSecret(
            var_name.to_string(),
            "must be hex-encoded (64 hex characters)".to_string(),
        )
    })?;
    if decoded.len() != CREDENTIALS_KEY_BYTES {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must decode to {} bytes (got {})",
                CREDENTIALS_KEY_BYTES,
                decoded.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 64 hex chars, every nibble value appears 4 times (entropy = 4.0 bits/char).
    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_uniform_hex() {
        // 16 symbols, each appearing equally often = exactly 4 bits per char
        let entropy = shannon_entropy(TEST_KEY);
        assert!((entropy - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_credentials_key_valid() {
        let key = SecretString::from(TEST_KEY);
        assert!(validate_credentials_key(&key, "TEST_KEY").is_ok());
    }

    #[test]
    fn test_validate_credentials_key_not_hex() {
        let key = SecretString::from("z".repeat(64));
        let result = validate_credentials_key(&key, "TEST_KEY");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_credentials_key_wrong_length() {
        let key = SecretString::from("0123456789abcdef");
        let result = validate_credentials_key(&key, "TEST_KEY");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn test_default_bling_endpoints() {
        assert_eq!(DEFAULT_BLING_API_BASE, "https://api.bling.com.br/Api/v3");
        assert_eq!(
            DEFAULT_BLING_TOKEN_URL,
            "https://www.bling.com.br/Api/v3/oauth/token"
        );
        assert_eq!(
            DEFAULT_BLING_AUTHORIZE_URL,
            "https://www.bling.com.br/Api/v3/oauth/authorize"
        );
    }

    #[test]
    fn test_openai_config_debug_redacts_secrets() {
        let config = OpenAiConfig {
            api_key: SecretString::from("sk-proj-super-secret-key"),
            model: "gpt-4o".to_string(),
        };

        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("gpt-4o"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-proj-super-secret-key"));
    }

    #[test]
    fn test_imgbb_config_debug_redacts_secrets() {
        let config = ImgbbConfig {
            api_key: SecretString::from("imgbb-super-private-key"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("imgbb-super-private-key"));
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "development".to_string(),
            credentials_key: SecretString::from(TEST_KEY),
            bling: BlingConfig {
                api_base: DEFAULT_BLING_API_BASE.to_string(),
                token_url: DEFAULT_BLING_TOKEN_URL.to_string(),
                authorize_url: DEFAULT_BLING_AUTHORIZE_URL.to_string(),
            },
            openai: None,
            imgbb: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }
}
