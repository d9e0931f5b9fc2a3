//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use oidc_issuer::config::SecretString;
use oidc_issuer::{
    ClientMetadata, ClientRegistry, FixedClock, Issuer, IssuerConfig, IssuerResult, Nonce,
    NonceStorage,
};
use time::OffsetDateTime;
use time::macros::datetime;

pub const T0: OffsetDateTime = datetime!(2024-03-01 09:30 UTC);
pub const ISSUER: &str = "https://op.example.com";

/// Mock client registry for testing.
#[derive(Default)]
pub struct MockClientRegistry {
    clients: RwLock<HashMap<String, ClientMetadata>>,
}

impl MockClientRegistry {
    pub fn register(&self, client: ClientMetadata) {
        self.clients
            .write()
            .unwrap()
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientRegistry for MockClientRegistry {
    async fn find_by_client_id(&self, client_id: &str) -> IssuerResult<Option<ClientMetadata>> {
        Ok(self.clients.read().unwrap().get(client_id).cloned())
    }
}

/// Mock nonce storage for testing.
#[derive(Default)]
pub struct MockNonceStorage {
    nonces: RwLock<Vec<Nonce>>,
}

impl MockNonceStorage {
    pub fn len(&self) -> usize {
        self.nonces.read().unwrap().len()
    }
}

#[async_trait]
impl NonceStorage for MockNonceStorage {
    async fn find_live_by_client(
        &self,
        client_id: &str,
        now: OffsetDateTime,
    ) -> IssuerResult<Vec<Nonce>> {
        Ok(self
            .nonces
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.client_id == client_id && n.is_live(now))
            .cloned()
            .collect())
    }

    async fn insert(&self, nonce: &Nonce, now: OffsetDateTime) -> IssuerResult<bool> {
        let mut nonces = self.nonces.write().unwrap();
        if nonces
            .iter()
            .any(|n| n.client_id == nonce.client_id && n.value == nonce.value && n.is_live(now))
        {
            return Ok(false);
        }
        nonces.push(nonce.clone());
        Ok(true)
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> IssuerResult<u64> {
        let mut nonces = self.nonces.write().unwrap();
        let before = nonces.len();
        nonces.retain(|n| n.is_live(now));
        Ok((before - nonces.len()) as u64)
    }
}

pub fn config() -> IssuerConfig {
    let mut config = IssuerConfig::default();
    config.issuer = ISSUER.to_string();
    config.signing.secret = Some(SecretString::new("integration-test-secret-0123456789"));
    config.nonce.storage_duration = Some(std::time::Duration::from_secs(300));
    config
}

pub struct Fixture {
    pub issuer: Issuer,
    pub clients: Arc<MockClientRegistry>,
    pub nonces: Arc<MockNonceStorage>,
    pub clock: Arc<FixedClock>,
}

pub fn fixture(clients: impl IntoIterator<Item = ClientMetadata>) -> Fixture {
    let registry = Arc::new(MockClientRegistry::default());
    for client in clients {
        registry.register(client);
    }
    let nonces = Arc::new(MockNonceStorage::default());
    let clock = Arc::new(FixedClock::new(T0));

    let issuer = Issuer::from_config(&config(), registry.clone(), nonces.clone(), clock.clone())
        .expect("valid configuration");

    Fixture {
        issuer,
        clients: registry,
        nonces,
        clock,
    }
}
