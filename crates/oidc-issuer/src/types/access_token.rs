//! Issued token entities.
//!
//! An [`AccessToken`] is created by the grant flow with its claims, scope,
//! expiration and client already set. The token enhancer decorates it in place:
//! it stamps the OpenID claims, signs it, and for OpenID requests attaches a
//! single [`IdTokenEntity`].

use std::collections::BTreeSet;
use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::token::{AccessTokenClaims, IdTokenClaims, Jwt};

/// Scope carried by every ID token entity.
pub const ID_TOKEN_SCOPE: &str = "id-token";

/// A signed (or not yet signed) ID token.
pub type IdToken = Jwt<IdTokenClaims>;

/// Reference to the authentication a token was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthenticationRef(pub Uuid);

impl AuthenticationRef {
    /// Creates a fresh random reference.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuthenticationRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuthenticationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Refresh token attached to an access token.
///
/// The enhancer only stamps its correlation nonce; it is never signed here.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Token claims.
    pub jwt: Jwt<AccessTokenClaims>,

    /// Expiration, if the refresh token expires.
    pub expiration: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Creates a refresh token from its claims.
    #[must_use]
    pub fn new(claims: AccessTokenClaims) -> Self {
        Self {
            jwt: Jwt::new(claims),
            expiration: None,
        }
    }

    /// Returns the claims.
    #[must_use]
    pub fn claims(&self) -> &AccessTokenClaims {
        self.jwt.claims()
    }
}

/// ID token owned by exactly one access token.
#[derive(Debug, Clone)]
pub struct IdTokenEntity {
    /// The signed ID token.
    pub jwt: IdToken,

    /// Expiration, mirrored from the `exp` claim.
    pub expiration: Option<OffsetDateTime>,

    /// Always `{"id-token"}`.
    pub scope: BTreeSet<String>,

    /// Client the parent access token was issued to.
    pub client_id: String,

    /// Authentication of the parent access token.
    pub authentication: Option<AuthenticationRef>,
}

impl IdTokenEntity {
    /// Returns the compact serialization, if signed.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.jwt.compact()
    }

    /// Returns the claims.
    #[must_use]
    pub fn claims(&self) -> &IdTokenClaims {
        self.jwt.claims()
    }
}

/// OAuth 2.0 access token as produced by the grant flow.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Token claims and signature.
    pub jwt: Jwt<AccessTokenClaims>,

    /// Expiration, copied into the `exp` claim at issuance.
    pub expiration: Option<OffsetDateTime>,

    /// Granted scopes.
    pub scope: BTreeSet<String>,

    /// Client the token is issued to.
    pub client_id: String,

    /// Authentication the token was issued under.
    pub authentication: Option<AuthenticationRef>,

    /// Attached refresh token.
    pub refresh_token: Option<RefreshToken>,

    /// Attached ID token, set only for OpenID requests.
    pub id_token: Option<IdTokenEntity>,
}

impl AccessToken {
    /// Creates an unsigned access token for `client_id` with the given claims.
    #[must_use]
    pub fn new(client_id: impl Into<String>, claims: AccessTokenClaims) -> Self {
        Self {
            jwt: Jwt::new(claims),
            expiration: None,
            scope: BTreeSet::new(),
            client_id: client_id.into(),
            authentication: None,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the expiration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: OffsetDateTime) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the authentication reference.
    #[must_use]
    pub fn with_authentication(mut self, authentication: AuthenticationRef) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Attaches a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: RefreshToken) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Returns the claims.
    #[must_use]
    pub fn claims(&self) -> &AccessTokenClaims {
        self.jwt.claims()
    }

    /// Returns the compact serialization, if signed.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.jwt.compact()
    }
}
