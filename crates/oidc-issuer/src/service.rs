//! Issuer facade.
//!
//! [`Issuer`] wires the authorization request validator and the token
//! enhancer to a client registry and a clock. It exposes the two operations
//! the surrounding authorization server calls:
//!
//! - [`Issuer::validate_authorization_request`] at the authorization step
//! - [`Issuer::enhance_token`] at the token step

use std::fmt;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::IssuerConfig;
use crate::error::IssuerError;
use crate::oauth::{
    AuthorizationContext, AuthorizationParameters, AuthorizationRequestValidator, NonceService,
    Principal,
};
use crate::storage::{ClientRegistry, NonceStorage};
use crate::token::{JwtSigningService, TokenEnhancer};
use crate::types::{AccessToken, ClientMetadata};
use crate::IssuerResult;

/// Token-issuance core of an OpenID Connect provider.
#[derive(Clone)]
pub struct Issuer {
    validator: AuthorizationRequestValidator,
    enhancer: TokenEnhancer,
    clients: Arc<dyn ClientRegistry>,
    clock: Arc<dyn Clock>,
}

impl Issuer {
    /// Creates an issuer from its parts.
    #[must_use]
    pub fn new(
        validator: AuthorizationRequestValidator,
        enhancer: TokenEnhancer,
        clients: Arc<dyn ClientRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator,
            enhancer,
            clients,
            clock,
        }
    }

    /// Validates `config` and builds an issuer on the given collaborators.
    ///
    /// # Errors
    /// Returns `IssuerError::Configuration` if the configuration is invalid.
    pub fn from_config(
        config: &IssuerConfig,
        clients: Arc<dyn ClientRegistry>,
        nonces: Arc<dyn NonceStorage>,
        clock: Arc<dyn Clock>,
    ) -> IssuerResult<Self> {
        config.validate()?;

        let signing = Arc::new(JwtSigningService::from_config(&config.signing)?);
        let nonce_service = NonceService::from_config(nonces, &config.nonce)?;
        let validator = AuthorizationRequestValidator::new(Arc::clone(&clients), nonce_service)
            .with_scope_fallback(config.scope.fallback);
        let enhancer = TokenEnhancer::new(config.issuer.clone(), signing);

        tracing::info!(
            issuer = %config.issuer,
            algorithm = %config.signing.algorithm,
            "OIDC issuer initialized"
        );

        Ok(Self::new(validator, enhancer, clients, clock))
    }

    /// Returns the authorization request validator.
    #[must_use]
    pub fn validator(&self) -> &AuthorizationRequestValidator {
        &self.validator
    }

    /// Returns the token enhancer.
    #[must_use]
    pub fn enhancer(&self) -> &TokenEnhancer {
        &self.enhancer
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Validates an authorization request at the current time.
    ///
    /// # Errors
    /// See [`AuthorizationRequestValidator::validate`].
    pub async fn validate_authorization_request(
        &self,
        parameters: &AuthorizationParameters,
        principal: Option<&Principal>,
    ) -> IssuerResult<AuthorizationContext> {
        let now = self.clock.now();
        self.validator.validate(parameters, principal, now).await
    }

    /// Enhances an issued access token at the current time.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::InvalidClient` if the context's client is no
    /// longer registered, or any error of [`TokenEnhancer::enhance`].
    pub async fn enhance_token(
        &self,
        token: AccessToken,
        context: &AuthorizationContext,
    ) -> IssuerResult<AccessToken> {
        let client = self.load_client(&context.client_id).await?;
        let now = self.clock.now();
        self.enhancer.enhance(token, context, &client, now)
    }

    async fn load_client(&self, client_id: &str) -> IssuerResult<ClientMetadata> {
        self.clients
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| IssuerError::invalid_client(format!("client not found: {client_id}")))
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("issuer", &self.enhancer.issuer())
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
