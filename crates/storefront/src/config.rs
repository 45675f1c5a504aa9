//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Gateway
//! - `GATEWAY_URL` - Base URL of the remote data service. Without it the
//!   client has no HTTP gateway configured.
//! - `GATEWAY_TOKEN` - Bearer token sent with every gateway call (optional)
//! - `GATEWAY_TIMEOUT_SECS` - Per-request timeout (default: 10)
//!
//! ## Optional
//! - `SEED_CATALOG_PATH` - YAML seed catalog replacing the built-in spices
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: development)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MIN_TOKEN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Storefront client configuration.
#[derive(Debug, Clone, Default)]
pub struct StorefrontConfig {
    /// Remote gateway, if `GATEWAY_URL` is set
    pub gateway: Option<GatewayConfig>,
    /// Seed catalog file replacing the built-in catalog
    pub seed_catalog_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote gateway connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct GatewayConfig {
    pub url: Url,
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the gateway token
    /// looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        Ok(Self {
            gateway: GatewayConfig::from_vars(&vars)?,
            seed_catalog_path: vars.optional("SEED_CATALOG_PATH").map(PathBuf::from),
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// The gateway settings, required by commands that talk to the remote
    /// service.
    ///
    /// # Errors
    ///
    /// Returns `MissingEnvVar("GATEWAY_URL")` when no gateway is configured.
    pub fn require_gateway(&self) -> Result<&GatewayConfig, ConfigError> {
        self.gateway
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_URL".to_string()))
    }
}

impl GatewayConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = vars.optional("GATEWAY_URL") else {
            return Ok(None);
        };
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_URL".to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "GATEWAY_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let token = vars
            .optional("GATEWAY_TOKEN")
            .map(|token| {
                validate_secret_strength(&token, "GATEWAY_TOKEN")?;
                Ok(SecretString::from(token))
            })
            .transpose()?;

        let timeout_secs = vars
            .optional("GATEWAY_TIMEOUT_SECS")
            .map_or(Ok(DEFAULT_TIMEOUT_SECS), |raw| {
                raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("GATEWAY_TIMEOUT_SECS".to_string(), e.to_string())
                })
            })?;

        Ok(Some(Self {
            url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        }))
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
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

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_TOKEN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_TOKEN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
