//! Token signing and decoration.
//!
//! This module provides:
//!
//! - HMAC JWS signers
//! - JWS compact serialization
//! - Per-client signer selection
//! - The token enhancer that stamps OpenID claims and attaches ID tokens

pub mod claims;
pub mod enhancer;
pub mod jws;
pub mod signer;
pub mod signing;

pub use claims::{AccessTokenClaims, IdTokenClaims, REGISTERED_ACCESS_CLAIMS};
pub use enhancer::TokenEnhancer;
pub use jws::{JwsHeader, Jwt};
pub use signer::{HmacSigner, JwtError, JwtSigner, SigningAlgorithm, SigningKey};
pub use signing::JwtSigningService;
