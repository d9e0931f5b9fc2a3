//! Symmetric JWS signers.
//!
//! This module provides HMAC signing for JWS compact serialization. It supports
//! the HS256, HS384 and HS512 algorithms from RFC 7518 Section 3.2.
//!
//! ## Supported Algorithms
//!
//! - **HS256**: HMAC with SHA-256 (default)
//! - **HS384**: HMAC with SHA-384
//! - **HS512**: HMAC with SHA-512
//!
//! Asymmetric algorithms are not implemented. They plug in behind
//! [`JwtSigner`] without changes to the JWS codec or the token enhancer.
//!
//! ## Example
//!
//! ```ignore
//! use oidc_issuer::token::{HmacSigner, JwtSigner, SigningAlgorithm, SigningKey};
//!
//! let key = SigningKey::new(SigningAlgorithm::HS256, b"a-long-shared-secret".to_vec())?;
//! let signer = HmacSigner::new(key);
//!
//! let signature = signer.sign("header.payload")?;
//! assert!(signer.verify("header.payload", &signature));
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWS operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The algorithm identifier is not supported.
    #[error("Unsupported signing algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The rejected algorithm identifier.
        algorithm: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a key or algorithm configuration error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey { .. } | Self::UnsupportedAlgorithm { .. }
        )
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for JWS tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Returns the algorithm name as used in JWS headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    /// Returns the MAC output width in bytes.
    #[must_use]
    pub fn digest_len(&self) -> usize {
        match self {
            Self::HS256 => 32,
            Self::HS384 => 48,
            Self::HS512 => 64,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(JwtError::unsupported_algorithm(other)),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// Shared secret bound to a signing algorithm.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: SigningAlgorithm,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Creates a key from raw secret bytes.
    ///
    /// # Errors
    /// Returns `JwtError::InvalidKey` if the secret is empty.
    pub fn new(algorithm: SigningAlgorithm, secret: impl Into<Vec<u8>>) -> Result<Self, JwtError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(JwtError::invalid_key("signing secret cannot be empty"));
        }
        Ok(Self { algorithm, secret })
    }

    /// Creates a key from a JWA algorithm name and a UTF-8 passphrase.
    ///
    /// # Errors
    /// Returns an error if the algorithm is unsupported or the passphrase is empty.
    pub fn from_passphrase(algorithm: &str, passphrase: &str) -> Result<Self, JwtError> {
        let algorithm = algorithm.parse::<SigningAlgorithm>()?;
        Self::new(algorithm, passphrase.as_bytes())
    }

    /// Returns the bound algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Signer
// ============================================================================

/// Computes and verifies JWS signatures over a signing input.
///
/// Implementations are pure functions of their key and input, so a single
/// instance can be shared across concurrent requests.
pub trait JwtSigner: Send + Sync {
    /// Returns the algorithm written into the JWS header.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Signs `signing_input` and returns the base64url (unpadded) signature.
    ///
    /// # Errors
    /// Returns an error if the signature cannot be computed.
    fn sign(&self, signing_input: &str) -> Result<String, JwtError>;

    /// Returns `true` if `signature` is valid for `signing_input`.
    fn verify(&self, signing_input: &str, signature: &str) -> bool;
}

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// HMAC-based [`JwtSigner`].
#[derive(Debug, Clone)]
pub struct HmacSigner {
    key: SigningKey,
}

impl HmacSigner {
    /// Creates a signer bound to `key`.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        if key.secret.len() < key.algorithm.digest_len() {
            tracing::warn!(
                algorithm = %key.algorithm,
                key_len = key.secret.len(),
                "HMAC secret is shorter than the hash output"
            );
        }
        Self { key }
    }

    fn mac(&self, input: &[u8]) -> Result<Vec<u8>, JwtError> {
        match self.key.algorithm {
            SigningAlgorithm::HS256 => compute_mac::<HmacSha256>(&self.key.secret, input),
            SigningAlgorithm::HS384 => compute_mac::<HmacSha384>(&self.key.secret, input),
            SigningAlgorithm::HS512 => compute_mac::<HmacSha512>(&self.key.secret, input),
        }
    }

    fn verify_mac(&self, input: &[u8], expected: &[u8]) -> bool {
        match self.key.algorithm {
            SigningAlgorithm::HS256 => verify_mac::<HmacSha256>(&self.key.secret, input, expected),
            SigningAlgorithm::HS384 => verify_mac::<HmacSha384>(&self.key.secret, input, expected),
            SigningAlgorithm::HS512 => verify_mac::<HmacSha512>(&self.key.secret, input, expected),
        }
    }
}

impl JwtSigner for HmacSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm
    }

    fn sign(&self, signing_input: &str) -> Result<String, JwtError> {
        let digest = self.mac(signing_input.as_bytes())?;
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }

    fn verify(&self, signing_input: &str, signature: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        self.verify_mac(signing_input.as_bytes(), &expected)
    }
}

fn compute_mac<M: Mac + KeyInit>(secret: &[u8], input: &[u8]) -> Result<Vec<u8>, JwtError> {
    let mut mac =
        <M as Mac>::new_from_slice(secret).map_err(|e| JwtError::invalid_key(e.to_string()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

// `verify_slice` compares in constant time.
fn verify_mac<M: Mac + KeyInit>(secret: &[u8], input: &[u8], expected: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(input);
            mac.verify_slice(expected).is_ok()
        }
        Err(_) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
