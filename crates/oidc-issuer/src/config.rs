//! Issuer configuration.
//!
//! All settings are read once at startup into an immutable [`IssuerConfig`]
//! and validated before any component is constructed. There is no built-in
//! issuer or signing secret: a configuration without them fails validation.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::token::SigningAlgorithm;

/// Longest accepted `nonce.storage_duration`.
pub const MAX_NONCE_STORAGE_DURATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Root issuer configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://op.example.com"
///
/// [signing]
/// algorithm = "HS256"
/// secret = "replace-with-a-long-random-value"
///
/// [nonce]
/// storage_duration = "5m"
///
/// [scope]
/// fallback = "registered_without_openid"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Issuer identifier (used in the `iss` claim of every token). Required.
    pub issuer: String,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Authorization nonce replay protection.
    pub nonce: NonceConfig,

    /// Scope negotiation policy.
    pub scope: ScopeConfig,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            signing: SigningConfig::default(),
            nonce: NonceConfig::default(),
            scope: ScopeConfig::default(),
        }
    }
}

/// A secret value that never appears in `Debug` output or serialized config.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Default signing algorithm.
    /// Supported: "HS256", "HS384", "HS512"
    pub algorithm: String,

    /// Shared secret for the default signer. Required.
    #[serde(skip_serializing)]
    pub secret: Option<SecretString>,

    /// Extra signers selectable through a client's preferred algorithm.
    pub additional: Vec<SignerConfig>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::default().as_str().to_string(),
            secret: None,
            additional: Vec::new(),
        }
    }
}

/// An additional signer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerConfig {
    /// Signing algorithm.
    pub algorithm: String,

    /// Shared secret.
    #[serde(skip_serializing)]
    pub secret: Option<SecretString>,
}

/// Authorization nonce configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NonceConfig {
    /// How long a used nonce blocks reuse of its value. Required, at most
    /// [`MAX_NONCE_STORAGE_DURATION`].
    #[serde(with = "humantime_serde")]
    pub storage_duration: Option<Duration>,

    /// Interval of the background reaper that deletes expired nonces.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            storage_duration: None,
            cleanup_interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl NonceConfig {
    /// Returns the storage duration as a `time::Duration`.
    ///
    /// # Errors
    /// Returns an error if the duration is unset, zero, or longer than
    /// [`MAX_NONCE_STORAGE_DURATION`].
    pub fn storage_duration(&self) -> Result<time::Duration, ConfigError> {
        let duration = self
            .storage_duration
            .ok_or_else(|| ConfigError::Missing("nonce.storage_duration".to_string()))?;

        if duration.is_zero() {
            return Err(ConfigError::InvalidValue(
                "nonce.storage_duration must be > 0".to_string(),
            ));
        }

        if duration > MAX_NONCE_STORAGE_DURATION {
            return Err(ConfigError::InvalidValue(format!(
                "nonce.storage_duration must be at most {}s",
                MAX_NONCE_STORAGE_DURATION.as_secs()
            )));
        }

        time::Duration::try_from(duration).map_err(|_| {
            ConfigError::InvalidValue("nonce.storage_duration is out of range".to_string())
        })
    }
}

/// Scope negotiation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// What to grant when an authorization request carries no scopes.
    pub fallback: ScopeFallback,
}

/// Policy for authorization requests without an explicit scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFallback {
    /// Grant the client's registered scopes, minus `openid`, so a request
    /// without scopes never becomes an OpenID request.
    #[default]
    RegisteredWithoutOpenid,

    /// Grant nothing.
    #[serde(alias = "none")]
    Disabled,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration source could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(String),
}

impl IssuerConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML and any validation error.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`IssuerConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded issuer configuration");
        Self::from_toml_str(&source)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The issuer is unset
    /// - A signing algorithm is not supported
    /// - A signing secret is missing or empty
    /// - Two signers use the same algorithm
    /// - The nonce storage duration is unset, zero, or too long
    /// - The nonce cleanup interval is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        let default_alg = parse_algorithm(&self.signing.algorithm)?;
        require_secret(self.signing.secret.as_ref(), "signing.secret")?;

        let mut seen = vec![default_alg];
        for (i, signer) in self.signing.additional.iter().enumerate() {
            let alg = parse_algorithm(&signer.algorithm)?;
            require_secret(
                signer.secret.as_ref(),
                &format!("signing.additional[{i}].secret"),
            )?;
            if seen.contains(&alg) {
                return Err(ConfigError::InvalidValue(format!(
                    "Duplicate signer for algorithm {alg}"
                )));
            }
            seen.push(alg);
        }

        self.nonce.storage_duration()?;

        if self.nonce.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "nonce.cleanup_interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_algorithm(name: &str) -> Result<SigningAlgorithm, ConfigError> {
    name.parse::<SigningAlgorithm>().map_err(|_| {
        ConfigError::InvalidValue(format!(
            "Invalid signing algorithm: '{}'. Must be HS256, HS384, or HS512",
            name
        ))
    })
}

fn require_secret(secret: Option<&SecretString>, field: &str) -> Result<(), ConfigError> {
    match secret {
        None => Err(ConfigError::Missing(field.to_string())),
        Some(s) if s.expose().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{field} cannot be empty"
        ))),
        Some(_) => Ok(()),
    }
}
