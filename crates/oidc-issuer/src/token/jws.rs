//! JWS compact serialization.
//!
//! A [`Jwt`] pairs a header with a typed claim set. Signing computes the
//! signature over `base64url(header) "." base64url(claims)` and caches the
//! compact form `header.payload.signature`. Mutating the claims through
//! [`Jwt::claims_mut`] discards the signature so a stale signature can never be
//! serialized.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::signer::{JwtError, JwtSigner, SigningAlgorithm};

/// JOSE header of a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signing algorithm.
    pub alg: SigningAlgorithm,

    /// Media type, `"JWT"` for tokens produced here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Default for JwsHeader {
    fn default() -> Self {
        Self {
            alg: SigningAlgorithm::default(),
            typ: Some("JWT".to_string()),
            kid: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Signed {
    signature: String,
    compact: String,
}

/// A claim set with its JOSE header and, once signed, its signature.
#[derive(Debug, Clone)]
pub struct Jwt<C> {
    header: JwsHeader,
    claims: C,
    signed: Option<Signed>,
}

impl<C> Jwt<C> {
    /// Creates an unsigned token with the default header.
    #[must_use]
    pub fn new(claims: C) -> Self {
        Self {
            header: JwsHeader::default(),
            claims,
            signed: None,
        }
    }

    /// Returns the header.
    #[must_use]
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    /// Returns the claims.
    #[must_use]
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// Returns the claims for modification, dropping any existing signature.
    pub fn claims_mut(&mut self) -> &mut C {
        self.signed = None;
        &mut self.claims
    }

    /// Returns `true` if the token carries a signature for its current claims.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    /// Returns the base64url signature, if signed.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signed.as_ref().map(|s| s.signature.as_str())
    }

    /// Returns the compact serialization, if signed.
    #[must_use]
    pub fn compact(&self) -> Option<&str> {
        self.signed.as_ref().map(|s| s.compact.as_str())
    }
}

impl<C: Serialize> Jwt<C> {
    /// Returns the JWS signing input for the current header and claims.
    ///
    /// # Errors
    /// Returns `JwtError::EncodingError` if the header or claims cannot be serialized.
    pub fn signing_input(&self) -> Result<String, JwtError> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| JwtError::encoding_error(format!("header: {e}")))?;
        let claims = serde_json::to_vec(&self.claims)
            .map_err(|e| JwtError::encoding_error(format!("claims: {e}")))?;

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        ))
    }

    /// Signs the token with `signer`, writing its algorithm into the header.
    ///
    /// # Errors
    /// Returns an error if encoding or signing fails. The token is left unsigned.
    pub fn sign(&mut self, signer: &dyn JwtSigner) -> Result<(), JwtError> {
        self.signed = None;
        self.header.alg = signer.algorithm();

        let signing_input = self.signing_input()?;
        let signature = signer.sign(&signing_input)?;
        let compact = format!("{signing_input}.{signature}");

        self.signed = Some(Signed { signature, compact });
        Ok(())
    }

    /// Returns the compact serialization.
    ///
    /// # Errors
    /// Returns `JwtError::EncodingError` if the token has not been signed.
    pub fn serialize(&self) -> Result<String, JwtError> {
        self.compact()
            .map(str::to_string)
            .ok_or_else(|| JwtError::encoding_error("token is not signed"))
    }
}

impl<C: DeserializeOwned> Jwt<C> {
    /// Parses a compact token and verifies its signature with `signer`.
    ///
    /// The header algorithm must match the signer's algorithm.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, uses a different algorithm,
    /// or the signature does not verify.
    pub fn decode(token: &str, signer: &dyn JwtSigner) -> Result<Self, JwtError> {
        let (signing_input, signature) = split_compact(token)?;
        let header = Self::parse_header(token)?;

        if header.alg != signer.algorithm() {
            return Err(JwtError::decoding_error(format!(
                "token algorithm {} does not match signer algorithm {}",
                header.alg,
                signer.algorithm()
            )));
        }

        if !signer.verify(signing_input, signature) {
            return Err(JwtError::InvalidSignature);
        }

        let payload = signing_input
            .split_once('.')
            .map(|(_, payload)| payload)
            .ok_or_else(|| JwtError::decoding_error("missing payload segment"))?;
        let claims = decode_segment::<C>(payload, "claims")?;

        Ok(Self {
            header,
            claims,
            signed: Some(Signed {
                signature: signature.to_string(),
                compact: token.to_string(),
            }),
        })
    }

    /// Parses the header of a compact token without verifying it.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or the algorithm is unsupported.
    pub fn parse_header(token: &str) -> Result<JwsHeader, JwtError> {
        let (signing_input, _) = split_compact(token)?;
        let header = signing_input
            .split_once('.')
            .map(|(header, _)| header)
            .ok_or_else(|| JwtError::decoding_error("missing header segment"))?;
        decode_segment::<JwsHeader>(header, "header")
    }
}

fn split_compact(token: &str) -> Result<(&str, &str), JwtError> {
    if token.split('.').count() != 3 {
        return Err(JwtError::decoding_error("expected three dot-separated segments"));
    }
    token
        .rsplit_once('.')
        .ok_or_else(|| JwtError::decoding_error("missing signature segment"))
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, JwtError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| JwtError::decoding_error(format!("{what} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| JwtError::decoding_error(format!("{what}: {e}")))
}
