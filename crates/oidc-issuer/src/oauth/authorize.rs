//! Authorization request validation.
//!
//! Runs at the authorization step, before any code or token is issued:
//!
//! 1. The `client_id` parameter must name a registered client.
//! 2. Every requested scope must be registered for a scope-restricted client.
//! 3. A `nonce` presented by an authenticated end-user is checked for replay
//!    and recorded.
//! 4. The granted scopes are resolved once, falling back to the client's
//!    registered scopes when the request names none.
//!
//! The result is an [`AuthorizationContext`] that the token enhancer later
//! consumes at the token step.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::nonce::NonceService;
use super::scope::{OPENID_SCOPE, parse_scope};
use crate::config::ScopeFallback;
use crate::error::IssuerError;
use crate::storage::ClientRegistry;
use crate::types::ClientMetadata;
use crate::IssuerResult;

// =============================================================================
// Request Parameters
// =============================================================================

/// Raw authorization request parameters.
///
/// The validator reads `client_id`, `scope` and `nonce`; all other parameters
/// are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationParameters(BTreeMap<String, String>);

impl AuthorizationParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the `client_id` parameter. An empty value counts as absent.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.get("client_id").filter(|v| !v.is_empty())
    }

    /// Returns the raw `scope` parameter.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.get("scope")
    }

    /// Returns the `nonce` parameter. An empty value counts as absent.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.get("nonce").filter(|v| !v.is_empty())
    }

    /// Iterates over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for AuthorizationParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Principal
// =============================================================================

/// The party the authorization request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject identifier, used as `sub` in ID tokens.
    pub subject: String,

    /// Whether the surrounding auth layer authenticated this party as an end-user.
    pub authenticated: bool,
}

impl Principal {
    /// Creates an authenticated end-user principal.
    #[must_use]
    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            authenticated: true,
        }
    }

    /// Creates an unauthenticated principal.
    #[must_use]
    pub fn unauthenticated(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            authenticated: false,
        }
    }

    /// Returns `true` if this is an authenticated end-user.
    #[must_use]
    pub fn is_authenticated_user(&self) -> bool {
        self.authenticated
    }
}

// =============================================================================
// Authorization Context
// =============================================================================

/// Validated authorization request.
///
/// Built once by [`AuthorizationRequestValidator`]; the granted scopes are
/// frozen at that point.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    /// Client the request was made by.
    pub client_id: String,

    /// Scopes named in the request.
    pub requested_scopes: BTreeSet<String>,

    /// Scopes granted after fallback resolution.
    pub granted_scopes: BTreeSet<String>,

    /// Non-empty `nonce` parameter, echoed into the ID token.
    pub requested_nonce: Option<String>,

    /// Principal the request was made for.
    pub principal: Option<Principal>,

    /// All request parameters.
    pub parameters: AuthorizationParameters,
}

impl AuthorizationContext {
    /// Returns `true` if the granted scopes include `openid`.
    #[must_use]
    pub fn is_openid(&self) -> bool {
        self.granted_scopes.contains(OPENID_SCOPE)
    }

    /// Returns the nonce to echo into the ID token.
    #[must_use]
    pub fn id_token_nonce(&self) -> Option<&str> {
        self.requested_nonce.as_deref().filter(|n| !n.is_empty())
    }

    /// Returns the principal's subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.subject.as_str())
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates authorization requests and records their nonces.
#[derive(Clone)]
pub struct AuthorizationRequestValidator {
    clients: Arc<dyn ClientRegistry>,
    nonces: NonceService,
    scope_fallback: ScopeFallback,
}

impl AuthorizationRequestValidator {
    /// Creates a validator with the default scope fallback.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientRegistry>, nonces: NonceService) -> Self {
        Self {
            clients,
            nonces,
            scope_fallback: ScopeFallback::default(),
        }
    }

    /// Sets the policy for requests without scopes.
    #[must_use]
    pub fn with_scope_fallback(mut self, fallback: ScopeFallback) -> Self {
        self.scope_fallback = fallback;
        self
    }

    /// Looks up the client named by the `client_id` parameter.
    ///
    /// # Errors
    /// Returns `IssuerError::InvalidClient` if the parameter is missing or the
    /// client is not registered.
    pub async fn resolve_client(
        &self,
        parameters: &AuthorizationParameters,
    ) -> IssuerResult<ClientMetadata> {
        let client_id = parameters
            .client_id()
            .ok_or_else(|| IssuerError::invalid_client("missing client_id"))?;

        match self.clients.find_by_client_id(client_id).await? {
            Some(client) => Ok(client),
            None => {
                tracing::warn!(client_id = %client_id, "Authorization request for unknown client");
                Err(IssuerError::invalid_client(format!(
                    "client not found: {client_id}"
                )))
            }
        }
    }

    /// Checks the requested scopes against the client's registration.
    ///
    /// A client without registered scopes accepts any scope.
    ///
    /// # Errors
    /// Returns `IssuerError::InvalidScope` naming the first unregistered scope.
    pub fn validate_scope(
        &self,
        parameters: &AuthorizationParameters,
        client: &ClientMetadata,
    ) -> IssuerResult<()> {
        let Some(scope) = parameters.scope() else {
            return Ok(());
        };

        if let Some(invalid) = scope
            .split_whitespace()
            .find(|s| !client.is_scope_allowed(s))
        {
            tracing::warn!(
                client_id = %client.client_id,
                scope = %invalid,
                "Authorization request for unregistered scope"
            );
            return Err(IssuerError::invalid_scope(
                invalid,
                client.scopes.iter().cloned(),
            ));
        }

        Ok(())
    }

    /// Builds the authorization context, recording the nonce if present.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::InvalidClient` if `client_id` is missing or does
    /// not match `client`, `IssuerError::NonceReplay` if the nonce was
    /// already used, or a storage error.
    pub async fn build_context(
        &self,
        parameters: &AuthorizationParameters,
        client: &ClientMetadata,
        principal: Option<&Principal>,
        now: OffsetDateTime,
    ) -> IssuerResult<AuthorizationContext> {
        let client_id = parameters
            .client_id()
            .ok_or_else(|| IssuerError::invalid_client("missing client_id"))?;
        if client_id != client.client_id {
            return Err(IssuerError::invalid_client(
                "client_id does not match the resolved client",
            ));
        }

        let requested_nonce = parameters.nonce().map(str::to_string);
        match (requested_nonce.as_deref(), principal) {
            (Some(nonce), Some(p)) if p.is_authenticated_user() => {
                self.nonces.check_and_record(client_id, nonce, now).await?;
            }
            (Some(_), _) => {
                tracing::debug!(
                    client_id = %client_id,
                    "Skipping nonce check for unauthenticated request"
                );
            }
            (None, _) => {}
        }

        let requested_scopes = parameters.scope().map(parse_scope).unwrap_or_default();
        let granted_scopes = if requested_scopes.is_empty() {
            self.fallback_scopes(client)
        } else {
            requested_scopes.clone()
        };

        tracing::debug!(
            client_id = %client_id,
            requested = requested_scopes.len(),
            granted = granted_scopes.len(),
            "Built authorization context"
        );

        Ok(AuthorizationContext {
            client_id: client_id.to_string(),
            requested_scopes,
            granted_scopes,
            requested_nonce,
            principal: principal.cloned(),
            parameters: parameters.clone(),
        })
    }

    /// Resolves the client, validates scopes, then builds the context.
    ///
    /// Scopes are checked before the nonce is recorded, so a rejected request
    /// does not consume its nonce.
    ///
    /// # Errors
    /// Returns any error of [`Self::resolve_client`], [`Self::validate_scope`]
    /// or [`Self::build_context`].
    pub async fn validate(
        &self,
        parameters: &AuthorizationParameters,
        principal: Option<&Principal>,
        now: OffsetDateTime,
    ) -> IssuerResult<AuthorizationContext> {
        let client = self.resolve_client(parameters).await?;
        self.validate_scope(parameters, &client)?;
        self.build_context(parameters, &client, principal, now).await
    }

    fn fallback_scopes(&self, client: &ClientMetadata) -> BTreeSet<String> {
        match self.scope_fallback {
            ScopeFallback::RegisteredWithoutOpenid => client
                .scopes
                .iter()
                .filter(|s| s.as_str() != OPENID_SCOPE)
                .cloned()
                .collect(),
            ScopeFallback::Disabled => BTreeSet::new(),
        }
    }
}

impl fmt::Debug for AuthorizationRequestValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequestValidator")
            .field("nonces", &self.nonces)
            .field("scope_fallback", &self.scope_fallback)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
