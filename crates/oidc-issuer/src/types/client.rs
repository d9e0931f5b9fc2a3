//! Registered client metadata.
//!
//! Field names serialize in camelCase so registrations can be loaded from the
//! same JSON documents the client registration endpoint stores.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::token::SigningAlgorithm;

// =============================================================================
// Client Metadata
// =============================================================================

/// Issuance-relevant registration data of an OAuth 2.0 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// OAuth scopes this client is allowed to request.
    /// Empty set means the client is not scope-restricted.
    #[serde(default)]
    pub scopes: BTreeSet<String>,

    /// ID token lifetime in seconds. ID tokens carry no `exp` claim when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_validity_seconds: Option<i64>,

    /// Algorithm this client wants its tokens signed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_signing_algorithm: Option<SigningAlgorithm>,
}

impl ClientMetadata {
    /// Creates metadata for `client_id` with no scope restriction.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            name: None,
            scopes: BTreeSet::new(),
            id_token_validity_seconds: None,
            preferred_signing_algorithm: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the registered scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the ID token lifetime in seconds.
    #[must_use]
    pub fn with_id_token_validity(mut self, seconds: i64) -> Self {
        self.id_token_validity_seconds = Some(seconds);
        self
    }

    /// Sets the preferred signing algorithm.
    #[must_use]
    pub fn with_signing_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.preferred_signing_algorithm = Some(algorithm);
        self
    }

    /// Returns `true` if the client has registered scopes.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Checks if the given scope is allowed for this client.
    ///
    /// An empty scopes set means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        !self.is_scoped() || self.scopes.contains(scope)
    }

    /// Returns the ID token lifetime, if configured.
    #[must_use]
    pub fn id_token_validity(&self) -> Option<time::Duration> {
        self.id_token_validity_seconds.map(time::Duration::seconds)
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client ID is empty, a registered scope is
    /// blank or contains whitespace, or the ID token validity is not positive.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if let Some(scope) = self
            .scopes
            .iter()
            .find(|s| s.is_empty() || s.chars().any(char::is_whitespace))
        {
            return Err(ClientValidationError::InvalidScope(scope.clone()));
        }

        if let Some(seconds) = self.id_token_validity_seconds {
            if seconds <= 0 {
                return Err(ClientValidationError::InvalidIdTokenValidity(seconds));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// A registered scope is not a single scope token.
    #[error("Invalid registered scope: '{0}'")]
    InvalidScope(String),

    /// ID token validity must be positive.
    #[error("ID token validity must be > 0, got {0}")]
    InvalidIdTokenValidity(i64),
}

// =============================================================================
// Tests
// =============================================================================
