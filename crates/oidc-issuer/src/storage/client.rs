//! Client registry trait.

use async_trait::async_trait;

use crate::IssuerResult;
use crate::types::ClientMetadata;

/// Read access to client registrations.
///
/// Registrations are managed elsewhere; the issuer only looks them up.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Finds a client by its client ID.
    ///
    /// Returns `None` if no client with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> IssuerResult<Option<ClientMetadata>>;
}
