//! Authorization step: request validation, scope negotiation and nonce
//! replay protection.

pub mod authorize;
pub mod nonce;
pub mod scope;

pub use authorize::{
    AuthorizationContext, AuthorizationParameters, AuthorizationRequestValidator, Principal,
};
pub use nonce::NonceService;
pub use scope::{OPENID_SCOPE, parse_scope};
