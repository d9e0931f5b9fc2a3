//! Issuance domain types.

mod access_token;
mod client;
mod nonce;

pub use access_token::{
    AccessToken, AuthenticationRef, ID_TOKEN_SCOPE, IdToken, IdTokenEntity, RefreshToken,
};
pub use client::{ClientMetadata, ClientValidationError};
pub use nonce::Nonce;
