//! Token claim sets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names backed by a dedicated [`AccessTokenClaims`] field.
pub const REGISTERED_ACCESS_CLAIMS: [&str; 8] =
    ["iss", "sub", "aud", "exp", "iat", "nonce", "scope", "client_id"];

/// Claims carried by access and refresh tokens.
///
/// The issuing flow fills in what it knows (subject, scope, client); the
/// token enhancer stamps audience, issuer, timestamps and the correlation
/// nonce. Unset claims are omitted from the serialized payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience (client ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Random correlation value stamped at issuance.
    ///
    /// Unrelated to the OpenID Connect authorization nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Space-separated scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// OAuth client ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Any additional claims. Keys in [`REGISTERED_ACCESS_CLAIMS`] are
    /// dropped at enhancement.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessTokenClaims {
    /// Returns `true` if a non-empty correlation nonce is present.
    #[must_use]
    pub fn has_nonce(&self) -> bool {
        self.nonce.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// Removes extra claims that would serialize next to a dedicated field,
    /// returning how many were dropped.
    pub fn remove_shadowing_extras(&mut self) -> usize {
        let before = self.extra.len();
        self.extra
            .retain(|key, _| !REGISTERED_ACCESS_CLAIMS.contains(&key.as_str()));
        before - self.extra.len()
    }
}

/// ID token claims for OpenID Connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (end-user identifier).
    pub sub: String,

    /// Audience (client ID).
    pub aud: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Time of the end-user authentication (Unix timestamp).
    pub auth_time: i64,

    /// Expiration time (Unix timestamp). Absent when the client has no
    /// ID token validity configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Nonce echoed from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}
