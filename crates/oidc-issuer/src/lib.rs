//! # oidc-issuer
//!
//! Token-issuance core of an OpenID Connect provider.
//!
//! This crate provides:
//! - HMAC-based JWS signing (HS256, HS384, HS512)
//! - Authorization request validation with scope negotiation
//! - Authorization nonce replay protection
//! - Access token enhancement with companion ID tokens
//!
//! ## Overview
//!
//! The core sits between the authorization server's endpoints and its
//! storage. At the authorization step, [`Issuer::validate_authorization_request`]
//! checks the client and scopes and records the request nonce. At the token
//! step, [`Issuer::enhance_token`] stamps OpenID claims onto the access token
//! issued by the grant flow, signs it and, for `openid` requests, attaches a
//! signed ID token.
//!
//! HTTP routing and persistence live outside this crate and plug in through
//! the traits in [`storage`].
//!
//! ## Modules
//!
//! - [`config`] - Issuer configuration
//! - [`oauth`] - Authorization request validation and nonce replay protection
//! - [`token`] - JWS signing and token enhancement
//! - [`storage`] - Storage traits for issuance data
//! - [`types`] - Client, token and nonce types
//! - [`clock`] - Time source

pub mod clock;
pub mod config;
pub mod error;
pub mod oauth;
pub mod service;
pub mod storage;
pub mod token;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, IssuerConfig, ScopeFallback, SecretString};
pub use error::{ErrorCategory, IssuerError};
pub use oauth::{
    AuthorizationContext, AuthorizationParameters, AuthorizationRequestValidator, NonceService,
    OPENID_SCOPE, Principal,
};
pub use service::Issuer;
pub use storage::{ClientRegistry, NonceStorage};
pub use token::{
    AccessTokenClaims, HmacSigner, IdTokenClaims, JwsHeader, Jwt, JwtError, JwtSigner,
    JwtSigningService, SigningAlgorithm, SigningKey, TokenEnhancer,
};
pub use types::{
    AccessToken, AuthenticationRef, ClientMetadata, ClientValidationError, ID_TOKEN_SCOPE,
    IdToken, IdTokenEntity, Nonce, RefreshToken,
};

/// Type alias for issuance results.
pub type IssuerResult<T> = Result<T, IssuerError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oidc_issuer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::IssuerResult;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{ConfigError, IssuerConfig};
    pub use crate::error::{ErrorCategory, IssuerError};
    pub use crate::oauth::{AuthorizationContext, AuthorizationParameters, Principal};
    pub use crate::service::Issuer;
    pub use crate::storage::{ClientRegistry, NonceStorage};
    pub use crate::token::{JwtSigner, SigningAlgorithm};
    pub use crate::types::{AccessToken, ClientMetadata, Nonce, RefreshToken};
}
