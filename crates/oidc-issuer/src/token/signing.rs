//! Signer selection.
//!
//! [`JwtSigningService`] owns the default signer and any additional signers
//! keyed by algorithm. Clients may name a preferred algorithm in their
//! registration; a preference without a configured signer falls back to the
//! default signer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::jws::Jwt;
use super::signer::{HmacSigner, JwtError, JwtSigner, SigningAlgorithm, SigningKey};
use crate::config::{ConfigError, SecretString, SigningConfig};

/// Signs and verifies tokens with the configured signers.
#[derive(Clone)]
pub struct JwtSigningService {
    default: Arc<dyn JwtSigner>,
    by_algorithm: HashMap<SigningAlgorithm, Arc<dyn JwtSigner>>,
}

impl JwtSigningService {
    /// Creates a service with a single default signer.
    #[must_use]
    pub fn new(default: Arc<dyn JwtSigner>) -> Self {
        let mut by_algorithm = HashMap::new();
        by_algorithm.insert(default.algorithm(), Arc::clone(&default));
        Self {
            default,
            by_algorithm,
        }
    }

    /// Registers an additional signer for its algorithm.
    ///
    /// A signer for the default algorithm is ignored; the default signer
    /// always wins for its own algorithm.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn JwtSigner>) -> Self {
        let alg = signer.algorithm();
        if alg != self.default.algorithm() {
            self.by_algorithm.insert(alg, signer);
        }
        self
    }

    /// Builds HMAC signers from configuration.
    ///
    /// # Errors
    /// Returns an error if an algorithm is unsupported or a secret is missing or empty.
    pub fn from_config(config: &SigningConfig) -> Result<Self, ConfigError> {
        let default = hmac_signer(&config.algorithm, config.secret.as_ref(), "signing.secret")?;
        let mut service = Self::new(default);

        for (i, signer) in config.additional.iter().enumerate() {
            let field = format!("signing.additional[{i}].secret");
            service = service.with_signer(hmac_signer(
                &signer.algorithm,
                signer.secret.as_ref(),
                &field,
            )?);
        }

        tracing::debug!(
            default_algorithm = %service.default.algorithm(),
            signers = service.by_algorithm.len(),
            "Initialized JWT signing service"
        );

        Ok(service)
    }

    /// Returns the default signer.
    #[must_use]
    pub fn default_signer(&self) -> &Arc<dyn JwtSigner> {
        &self.default
    }

    /// Returns the algorithms with a configured signer.
    pub fn algorithms(&self) -> impl Iterator<Item = SigningAlgorithm> + '_ {
        self.by_algorithm.keys().copied()
    }

    /// Returns the signer for `preferred`, or the default signer.
    #[must_use]
    pub fn signer_for(&self, preferred: Option<SigningAlgorithm>) -> &Arc<dyn JwtSigner> {
        match preferred {
            None => &self.default,
            Some(alg) => match self.by_algorithm.get(&alg) {
                Some(signer) => signer,
                None => {
                    tracing::debug!(
                        preferred = %alg,
                        fallback = %self.default.algorithm(),
                        "No signer for preferred algorithm, using default"
                    );
                    &self.default
                }
            },
        }
    }

    /// Signs `jwt` with the signer for `preferred`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signing fails.
    pub fn sign_jwt<C: Serialize>(
        &self,
        jwt: &mut Jwt<C>,
        preferred: Option<SigningAlgorithm>,
    ) -> Result<(), JwtError> {
        jwt.sign(self.signer_for(preferred).as_ref())
    }

    /// Decodes and verifies a compact token with the signer named by its header.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, no signer matches its
    /// algorithm, or verification fails.
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<Jwt<C>, JwtError> {
        let header = Jwt::<C>::parse_header(token)?;
        let signer = self
            .by_algorithm
            .get(&header.alg)
            .ok_or_else(|| JwtError::unsupported_algorithm(header.alg.as_str()))?;
        Jwt::decode(token, signer.as_ref())
    }
}

impl fmt::Debug for JwtSigningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut algorithms: Vec<_> = self.by_algorithm.keys().map(|a| a.as_str()).collect();
        algorithms.sort_unstable();
        f.debug_struct("JwtSigningService")
            .field("default", &self.default.algorithm())
            .field("algorithms", &algorithms)
            .finish()
    }
}

fn hmac_signer(
    algorithm: &str,
    secret: Option<&SecretString>,
    field: &str,
) -> Result<Arc<dyn JwtSigner>, ConfigError> {
    let secret = secret.ok_or_else(|| ConfigError::Missing(field.to_string()))?;
    let key = SigningKey::from_passphrase(algorithm, secret.expose())
        .map_err(|e| ConfigError::InvalidValue(format!("{field}: {e}")))?;
    Ok(Arc::new(HmacSigner::new(key)))
}
