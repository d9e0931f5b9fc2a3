//! Issuance error types.
//!
//! This module defines the errors that can occur while validating an
//! authorization request or issuing tokens.

use std::fmt;

use crate::config::ConfigError;
use crate::token::JwtError;

/// Errors that can occur during authorization validation and token issuance.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    /// The client is missing from the request or not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// A requested scope is not registered for the client.
    #[error("Invalid scope: {scope}")]
    InvalidScope {
        /// The first offending scope.
        scope: String,
        /// The scopes the client is allowed to request.
        valid_scopes: Vec<String>,
    },

    /// The authorization nonce was already used by this client.
    ///
    /// The nonce value is carried for the caller but never displayed.
    #[error("Nonce already used by client {client_id}")]
    NonceReplay {
        /// The client that presented the nonce.
        client_id: String,
        /// The replayed nonce value.
        nonce: String,
    },

    /// The grant cannot produce the requested tokens.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// A token could not be signed. Issuance is aborted.
    #[error("Signing failure: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// An error occurred while storing or retrieving issuance data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The issuer configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl IssuerError {
    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope<I, S>(scope: impl Into<String>, valid_scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidScope {
            scope: scope.into(),
            valid_scopes: valid_scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a new `NonceReplay` error.
    #[must_use]
    pub fn nonce_replay(client_id: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self::NonceReplay {
            client_id: client_id.into(),
            nonce: nonce.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient { .. }
                | Self::InvalidScope { .. }
                | Self::NonceReplay { .. }
                | Self::InvalidGrant { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Signing { .. } | Self::Storage { .. } | Self::Configuration { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::NonceReplay { .. } => ErrorCategory::Replay,
            Self::InvalidGrant { .. } => ErrorCategory::Authorization,
            Self::Signing { .. } => ErrorCategory::Signing,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::NonceReplay { .. } => "invalid_request",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::Signing { .. } => "server_error",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
        }
    }
}

impl From<JwtError> for IssuerError {
    fn from(err: JwtError) -> Self {
        if err.is_key_error() {
            Self::configuration(err.to_string())
        } else {
            Self::signing(err.to_string())
        }
    }
}

impl From<ConfigError> for IssuerError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

/// Categories of issuance errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client identification errors.
    Authentication,
    /// Scope and grant errors.
    Authorization,
    /// Authorization nonce replay.
    Replay,
    /// Token signing errors.
    Signing,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Replay => write!(f, "replay"),
            Self::Signing => write!(f, "signing"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
