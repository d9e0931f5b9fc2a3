//! In-memory nonce storage.

use async_trait::async_trait;
use dashmap::DashMap;
use oidc_issuer::{IssuerResult, Nonce, NonceStorage};
use time::OffsetDateTime;

/// Nonce storage backed by a concurrent map keyed by client ID.
///
/// Each client's nonces sit behind one map entry, so `insert` checks and
/// records a value while holding that entry's lock.
#[derive(Debug, Default)]
pub struct InMemoryNonceStorage {
    by_client: DashMap<String, Vec<Nonce>>,
}

impl InMemoryNonceStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored nonces, live or expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_client.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns `true` if no nonces are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NonceStorage for InMemoryNonceStorage {
    async fn find_live_by_client(
        &self,
        client_id: &str,
        now: OffsetDateTime,
    ) -> IssuerResult<Vec<Nonce>> {
        Ok(self
            .by_client
            .get(client_id)
            .map(|nonces| nonces.iter().filter(|n| n.is_live(now)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, nonce: &Nonce, now: OffsetDateTime) -> IssuerResult<bool> {
        let mut nonces = self.by_client.entry(nonce.client_id.clone()).or_default();
        if nonces.iter().any(|n| n.value == nonce.value && n.is_live(now)) {
            return Ok(false);
        }
        // Expired duplicates of this value are dropped so only the live record remains.
        nonces.retain(|n| n.value != nonce.value);
        nonces.push(nonce.clone());
        Ok(true)
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> IssuerResult<u64> {
        let mut removed = 0u64;
        self.by_client.retain(|_, nonces| {
            let before = nonces.len();
            nonces.retain(|n| n.is_live(now));
            removed += (before - nonces.len()) as u64;
            !nonces.is_empty()
        });
        Ok(removed)
    }
}
