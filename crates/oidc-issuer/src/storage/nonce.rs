//! Authorization nonce storage trait for replay prevention.
//!
//! # Security Considerations
//!
//! - Nonces must be stored with their expiration time
//! - The uniqueness check on insert must be atomic per (client, value)
//! - Expired nonces must not block reuse and should be cleaned up periodically
//!
//! # Implementation Notes
//!
//! `insert` is the atomic uniqueness point. Callers may look up live nonces
//! first, but only a successful insert proves the value was unused, since a
//! concurrent request can record the same value between the two calls.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::IssuerResult;
use crate::types::Nonce;

/// Storage trait for used authorization nonces.
///
/// # Implementations
///
/// Implementations are provided in separate crates:
/// - `oidc-issuer-memory` - in-process storage backend
#[async_trait]
pub trait NonceStorage: Send + Sync {
    /// Returns the nonces of `client_id` that are still live at `now`.
    ///
    /// A nonce whose `expire_date <= now` must not be returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_live_by_client(
        &self,
        client_id: &str,
        now: OffsetDateTime,
    ) -> IssuerResult<Vec<Nonce>>;

    /// Atomically records `nonce` unless a live nonce with the same client and
    /// value exists at `now`.
    ///
    /// # Returns
    ///
    /// Returns `true` if the nonce was recorded (first use),
    /// or `false` if a live duplicate already exists (replay).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn insert(&self, nonce: &Nonce, now: OffsetDateTime) -> IssuerResult<bool>;

    /// Deletes nonces that expired at or before `now`.
    ///
    /// Returns the number of deleted nonces.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> IssuerResult<u64>;
}
