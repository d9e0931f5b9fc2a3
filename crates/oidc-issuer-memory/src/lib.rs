//! In-memory storage backend for `oidc-issuer`.
//!
//! Provides [`InMemoryNonceStorage`] and [`InMemoryClientRegistry`] plus a
//! background task that reaps expired nonces. State lives in the process and
//! is lost on restart, so this backend suits single-instance deployments and
//! tests.

mod client;
mod nonce;
mod reaper;

pub use client::InMemoryClientRegistry;
pub use nonce::InMemoryNonceStorage;
pub use reaper::{MIN_REAP_INTERVAL, spawn_nonce_reaper};
