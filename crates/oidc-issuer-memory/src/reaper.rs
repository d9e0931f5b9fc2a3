//! Background nonce cleanup task.
//!
//! Periodically deletes expired nonces from storage. Expired nonces never
//! block reuse, so the reaper only bounds memory; issuance stays correct
//! whether or not it runs.

use std::sync::Arc;
use std::time::Duration;

use oidc_issuer::{Clock, NonceStorage};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Shortest interval the reaper runs at.
pub const MIN_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a background task that deletes expired nonces every `every`.
///
/// `every` is normally `IssuerConfig::nonce.cleanup_interval`. Values below
/// [`MIN_REAP_INTERVAL`] are raised to it.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_nonce_reaper(
    storage: Arc<dyn NonceStorage>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    if every < MIN_REAP_INTERVAL {
        warn!(
            requested_ms = every.as_millis() as u64,
            "Nonce cleanup interval too short, using minimum"
        );
    }
    let every = every.max(MIN_REAP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = interval(every);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match storage.cleanup_expired(clock.now()).await {
                Ok(0) => debug!("Nonce cleanup: no expired nonces"),
                Ok(count) => info!(removed = count, "Nonce cleanup completed"),
                Err(e) => warn!(error = %e, "Nonce cleanup failed"),
            }
        }
    })
}
