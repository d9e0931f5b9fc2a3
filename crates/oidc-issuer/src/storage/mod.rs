//! Storage traits for issuance data.
//!
//! This module defines storage interfaces for:
//!
//! - Client registrations
//! - Used authorization nonces
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `oidc-issuer-memory` - in-process storage backend

pub mod client;
pub mod nonce;

pub use client::ClientRegistry;
pub use nonce::NonceStorage;
