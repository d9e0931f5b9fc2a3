//! In-memory client registry.

use async_trait::async_trait;
use dashmap::DashMap;
use oidc_issuer::{ClientMetadata, ClientRegistry, ClientValidationError, IssuerResult};

/// Client registry backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    clients: DashMap<String, ClientMetadata>,
}

impl InMemoryClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a client, replacing any previous registration.
    ///
    /// # Errors
    /// Returns an error if the client metadata is invalid.
    pub fn register(&self, client: ClientMetadata) -> Result<(), ClientValidationError> {
        client.validate()?;
        tracing::debug!(client_id = %client.client_id, "Registered client");
        self.clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Removes a client. Returns `true` if it was registered.
    pub fn remove(&self, client_id: &str) -> bool {
        self.clients.remove(client_id).is_some()
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn find_by_client_id(&self, client_id: &str) -> IssuerResult<Option<ClientMetadata>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }
}
