//! Authorization nonce replay protection.
//!
//! Every authorization request from an authenticated end-user that carries a
//! `nonce` parameter records that value for the client. Presenting the same
//! value again while the record is live is a replay and fails the request.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::{MAX_NONCE_STORAGE_DURATION, NonceConfig};
use crate::error::IssuerError;
use crate::storage::NonceStorage;
use crate::types::Nonce;
use crate::IssuerResult;

/// Records used nonces and rejects replays.
#[derive(Clone)]
pub struct NonceService {
    storage: Arc<dyn NonceStorage>,
    storage_duration: time::Duration,
}

impl NonceService {
    /// Creates a service that blocks reuse of a nonce for `storage_duration`.
    ///
    /// # Errors
    /// Returns `IssuerError::Configuration` if the duration is not positive
    /// or exceeds [`MAX_NONCE_STORAGE_DURATION`].
    pub fn new(
        storage: Arc<dyn NonceStorage>,
        storage_duration: time::Duration,
    ) -> IssuerResult<Self> {
        if !storage_duration.is_positive() {
            return Err(IssuerError::configuration(
                "nonce storage duration must be > 0",
            ));
        }
        if storage_duration > MAX_NONCE_STORAGE_DURATION {
            return Err(IssuerError::configuration(
                "nonce storage duration is too long",
            ));
        }
        Ok(Self {
            storage,
            storage_duration,
        })
    }

    /// Creates a service from configuration.
    ///
    /// # Errors
    /// Returns `IssuerError::Configuration` if the storage duration is unset or invalid.
    pub fn from_config(storage: Arc<dyn NonceStorage>, config: &NonceConfig) -> IssuerResult<Self> {
        Self::new(storage, config.storage_duration()?)
    }

    /// Returns how long a used nonce blocks reuse.
    #[must_use]
    pub fn storage_duration(&self) -> time::Duration {
        self.storage_duration
    }

    /// Fails if `value` is live for `client_id`, otherwise records it.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::NonceReplay` if the nonce was already used, or a
    /// storage error if the lookup or insert fails.
    pub async fn check_and_record(
        &self,
        client_id: &str,
        value: &str,
        now: OffsetDateTime,
    ) -> IssuerResult<()> {
        let live = self.storage.find_live_by_client(client_id, now).await?;
        if live.iter().any(|n| n.value == value && n.is_live(now)) {
            tracing::warn!(client_id = %client_id, "Authorization nonce replay rejected");
            return Err(IssuerError::nonce_replay(client_id, value));
        }

        let nonce = Nonce::new(client_id, value, now, self.storage_duration)?;
        if !self.storage.insert(&nonce, now).await? {
            // Lost the race against a concurrent request with the same value.
            tracing::warn!(client_id = %client_id, "Authorization nonce replay rejected");
            return Err(IssuerError::nonce_replay(client_id, value));
        }

        tracing::debug!(
            client_id = %client_id,
            expires_at = %nonce.expire_date,
            "Recorded authorization nonce"
        );
        Ok(())
    }
}

impl fmt::Debug for NonceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceService")
            .field("storage_duration", &self.storage_duration)
            .finish_non_exhaustive()
    }
}
