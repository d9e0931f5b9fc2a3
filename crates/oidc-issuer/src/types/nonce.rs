//! Authorization nonce records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::IssuerResult;
use crate::error::IssuerError;

/// A used authorization nonce.
///
/// Records are created when an authenticated end-user presents a `nonce`
/// parameter and are never mutated. A record stops blocking its value once
/// `expire_date` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nonce {
    /// Client that presented the nonce.
    pub client_id: String,

    /// Nonce value as sent in the authorization request.
    pub value: String,

    /// When the nonce was used.
    #[serde(with = "time::serde::rfc3339")]
    pub use_date: OffsetDateTime,

    /// When the record stops blocking reuse.
    #[serde(with = "time::serde::rfc3339")]
    pub expire_date: OffsetDateTime,
}

impl Nonce {
    /// Creates a record used at `now` that expires after `storage_duration`.
    ///
    /// # Errors
    /// Returns `IssuerError::Configuration` if the expiry is not representable.
    pub fn new(
        client_id: impl Into<String>,
        value: impl Into<String>,
        now: OffsetDateTime,
        storage_duration: time::Duration,
    ) -> IssuerResult<Self> {
        let expire_date = now
            .checked_add(storage_duration)
            .ok_or_else(|| IssuerError::configuration("nonce expiry is out of range"))?;
        Ok(Self {
            client_id: client_id.into(),
            value: value.into(),
            use_date: now,
            expire_date,
        })
    }

    /// Returns `true` while the record still blocks reuse at `now`.
    #[must_use]
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expire_date > now
    }
}
