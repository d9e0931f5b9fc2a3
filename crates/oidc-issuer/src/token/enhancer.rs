//! Token enhancement.
//!
//! The enhancer runs at the token step, after the grant flow has built an
//! access token. It stamps the audience, issuer, timestamps and a fresh
//! correlation nonce, signs the access token, and for OpenID requests builds,
//! signs and attaches an ID token.
//!
//! The access token is taken by value and only handed back on success, so a
//! failed enhancement never yields a partially signed token.

use std::collections::BTreeSet;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::claims::IdTokenClaims;
use super::jws::Jwt;
use super::signing::JwtSigningService;
use crate::error::IssuerError;
use crate::oauth::AuthorizationContext;
use crate::types::{AccessToken, ClientMetadata, ID_TOKEN_SCOPE, IdTokenEntity};
use crate::IssuerResult;

/// Decorates issued access tokens with OpenID Connect claims.
#[derive(Debug, Clone)]
pub struct TokenEnhancer {
    issuer: String,
    signing: Arc<JwtSigningService>,
}

impl TokenEnhancer {
    /// Creates an enhancer for `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, signing: Arc<JwtSigningService>) -> Self {
        Self {
            issuer: issuer.into(),
            signing,
        }
    }

    /// Returns the issuer identifier.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the signing service.
    #[must_use]
    pub fn signing(&self) -> &Arc<JwtSigningService> {
        &self.signing
    }

    /// Stamps, signs and, for OpenID requests, attaches an ID token.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::InvalidClient` if the token or context belong to
    /// another client or the client's ID token validity is unusable,
    /// `IssuerError::InvalidGrant` if an OpenID context has no principal, or a
    /// signing error.
    pub fn enhance(
        &self,
        mut token: AccessToken,
        context: &AuthorizationContext,
        client: &ClientMetadata,
        now: OffsetDateTime,
    ) -> IssuerResult<AccessToken> {
        if context.client_id != client.client_id || token.client_id != client.client_id {
            return Err(IssuerError::invalid_client(
                "token, authorization and client registration disagree on client_id",
            ));
        }

        let claims = token.jwt.claims_mut();
        let dropped = claims.remove_shadowing_extras();
        if dropped > 0 {
            tracing::warn!(
                client_id = %client.client_id,
                dropped,
                "Dropped extra claims shadowing registered claims"
            );
        }
        claims.aud = Some(client.client_id.clone());
        claims.iss = Some(self.issuer.clone());
        claims.iat = Some(now.unix_timestamp());
        claims.exp = token.expiration.map(OffsetDateTime::unix_timestamp);
        claims.nonce = Some(Uuid::new_v4().to_string());

        if let Some(refresh) = token.refresh_token.as_mut() {
            if !refresh.claims().has_nonce() {
                let claims = refresh.jwt.claims_mut();
                claims.remove_shadowing_extras();
                claims.nonce = Some(Uuid::new_v4().to_string());
            }
        }

        let preferred = client.preferred_signing_algorithm;
        self.signing.sign_jwt(&mut token.jwt, preferred)?;

        if context.is_openid() {
            let subject = context.subject().ok_or_else(|| {
                IssuerError::invalid_grant("an ID token requires an authenticated subject")
            })?;

            let expiration = id_token_expiration(client, now)?;
            let mut id_token = Jwt::new(IdTokenClaims {
                iss: self.issuer.clone(),
                sub: subject.to_string(),
                aud: client.client_id.clone(),
                iat: now.unix_timestamp(),
                auth_time: now.unix_timestamp(),
                exp: expiration.map(OffsetDateTime::unix_timestamp),
                nonce: context.id_token_nonce().map(str::to_string),
            });
            self.signing.sign_jwt(&mut id_token, preferred)?;

            token.id_token = Some(IdTokenEntity {
                jwt: id_token,
                expiration,
                scope: BTreeSet::from([ID_TOKEN_SCOPE.to_string()]),
                client_id: client.client_id.clone(),
                authentication: token.authentication,
            });
        }

        tracing::debug!(
            client_id = %client.client_id,
            id_token = token.id_token.is_some(),
            "Enhanced access token"
        );

        Ok(token)
    }
}

fn id_token_expiration(
    client: &ClientMetadata,
    now: OffsetDateTime,
) -> IssuerResult<Option<OffsetDateTime>> {
    let Some(validity) = client.id_token_validity() else {
        return Ok(None);
    };
    if !validity.is_positive() {
        return Err(IssuerError::invalid_client(
            "idTokenValiditySeconds must be positive",
        ));
    }
    now.checked_add(validity)
        .map(Some)
        .ok_or_else(|| IssuerError::invalid_client("idTokenValiditySeconds is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::{AuthorizationParameters, Principal, parse_scope};
    use crate::token::{
        AccessTokenClaims, HmacSigner, JwtError, JwtSigner, SigningAlgorithm, SigningKey,
    };
    use crate::types::{AuthenticationRef, RefreshToken};
    use time::macros::datetime;

    const T: OffsetDateTime = datetime!(2024-01-01 12:00 UTC);
    const SECRET: &[u8] = b"an-hs256-secret-of-32-bytes-long";

    /// Signer whose every call fails.
    struct FailingSigner;

    impl JwtSigner for FailingSigner {
        fn algorithm(&self) -> SigningAlgorithm {
            SigningAlgorithm::HS256
        }

        fn sign(&self, _signing_input: &str) -> Result<String, JwtError> {
            Err(JwtError::encoding_error("hsm offline"))
        }

        fn verify(&self, _signing_input: &str, _signature: &str) -> bool {
            false
        }
    }

    fn signing() -> Arc<JwtSigningService> {
        let key = |alg| SigningKey::new(alg, SECRET.to_vec()).unwrap();
        Arc::new(
            JwtSigningService::new(Arc::new(HmacSigner::new(key(SigningAlgorithm::HS256))))
                .with_signer(Arc::new(HmacSigner::new(key(SigningAlgorithm::HS512)))),
        )
    }

    fn enhancer() -> TokenEnhancer {
        TokenEnhancer::new("https://op.example.com", signing())
    }

    fn client() -> ClientMetadata {
        ClientMetadata::new("acme-app")
            .with_scopes(["openid", "profile", "email"])
            .with_id_token_validity(600)
    }

    fn context(scope: &str, nonce: Option<&str>) -> AuthorizationContext {
        let mut parameters = AuthorizationParameters::new()
            .with("client_id", "acme-app")
            .with("scope", scope);
        if let Some(n) = nonce {
            parameters.insert("nonce", n);
        }
        AuthorizationContext {
            client_id: "acme-app".to_string(),
            requested_scopes: parse_scope(scope),
            granted_scopes: parse_scope(scope),
            requested_nonce: nonce.map(str::to_string),
            principal: Some(Principal::authenticated("alice")),
            parameters,
        }
    }

    fn access_token() -> AccessToken {
        AccessToken::new(
            "acme-app",
            AccessTokenClaims {
                sub: Some("alice".to_string()),
                ..Default::default()
            },
        )
        .with_expiration(T + time::Duration::hours(1))
        .with_authentication(AuthenticationRef::new())
    }

    #[test]
    fn test_stamps_access_token_claims() {
        let token = enhancer()
            .enhance(access_token(), &context("profile", None), &client(), T)
            .unwrap();

        let claims = token.claims();
        assert_eq!(claims.aud.as_deref(), Some("acme-app"));
        assert_eq!(claims.iss.as_deref(), Some("https://op.example.com"));
        assert_eq!(claims.iat, Some(T.unix_timestamp()));
        assert_eq!(claims.exp, Some((T + time::Duration::hours(1)).unix_timestamp()));
        assert_eq!(claims.sub.as_deref(), Some("alice"));

        let nonce = claims.nonce.as_deref().unwrap();
        assert!(Uuid::parse_str(nonce).is_ok());
    }

    #[test]
    fn test_access_token_is_signed_and_verifiable() {
        let enhancer = enhancer();
        let token = enhancer
            .enhance(access_token(), &context("profile", None), &client(), T)
            .unwrap();

        let value = token.value().unwrap();
        assert_eq!(value.split('.').count(), 3);
        let decoded: Jwt<AccessTokenClaims> = enhancer.signing().decode(value).unwrap();
        assert_eq!(decoded.claims(), token.claims());
    }

    #[test]
    fn test_missing_expiration_leaves_exp_unset() {
        let token = AccessToken::new("acme-app", AccessTokenClaims::default());
        let token = enhancer()
            .enhance(token, &context("profile", None), &client(), T)
            .unwrap();
        assert!(token.claims().exp.is_none());
    }

    #[test]
    fn test_correlation_nonce_is_fresh_per_token() {
        let enhancer = enhancer();
        let ctx = context("profile", None);
        let a = enhancer.enhance(access_token(), &ctx, &client(), T).unwrap();
        let b = enhancer.enhance(access_token(), &ctx, &client(), T).unwrap();
        assert_ne!(a.claims().nonce, b.claims().nonce);
    }

    #[test]
    fn test_refresh_token_nonce_stamped_only_when_missing() {
        let enhancer = enhancer();
        let ctx = context("profile", None);

        let fresh = access_token().with_refresh_token(RefreshToken::new(AccessTokenClaims::default()));
        let token = enhancer.enhance(fresh, &ctx, &client(), T).unwrap();
        let refresh = token.refresh_token.as_ref().unwrap();
        assert!(refresh.claims().has_nonce());
        assert!(!refresh.jwt.is_signed());
        assert_ne!(refresh.claims().nonce, token.claims().nonce);

        let existing = access_token().with_refresh_token(RefreshToken::new(AccessTokenClaims {
            nonce: Some("keep-me".to_string()),
            ..Default::default()
        }));
        let token = enhancer.enhance(existing, &ctx, &client(), T).unwrap();
        assert_eq!(
            token.refresh_token.unwrap().claims().nonce.as_deref(),
            Some("keep-me")
        );
    }

    #[test]
    fn test_no_id_token_without_openid_scope() {
        let token = enhancer()
            .enhance(access_token(), &context("profile email", Some("n1")), &client(), T)
            .unwrap();
        assert!(token.id_token.is_none());
        assert!(token.value().is_some());
    }

    #[test]
    fn test_id_token_attached_for_openid_scope() {
        let enhancer = enhancer();
        let parent = access_token();
        let authentication = parent.authentication;
        let token = enhancer
            .enhance(parent, &context("openid profile", Some("xyz123")), &client(), T)
            .unwrap();

        let id_token = token.id_token.as_ref().unwrap();
        let claims = id_token.claims();
        assert_eq!(claims.iss, "https://op.example.com");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, "acme-app");
        assert_eq!(claims.iat, T.unix_timestamp());
        assert_eq!(claims.auth_time, T.unix_timestamp());
        assert_eq!(claims.exp, Some(T.unix_timestamp() + 600));
        assert_eq!(claims.nonce.as_deref(), Some("xyz123"));

        assert_eq!(id_token.expiration, Some(T + time::Duration::seconds(600)));
        assert_eq!(id_token.scope, BTreeSet::from([ID_TOKEN_SCOPE.to_string()]));
        assert_eq!(id_token.client_id, "acme-app");
        assert_eq!(id_token.authentication, authentication);

        let decoded: Jwt<IdTokenClaims> = enhancer
            .signing()
            .decode(id_token.value().unwrap())
            .unwrap();
        assert_eq!(decoded.claims(), claims);
    }

    #[test]
    fn test_id_token_without_client_validity_has_no_exp() {
        let client = ClientMetadata::new("acme-app").with_scopes(["openid"]);
        let token = enhancer()
            .enhance(access_token(), &context("openid", None), &client, T)
            .unwrap();

        let id_token = token.id_token.unwrap();
        assert!(id_token.claims().exp.is_none());
        assert!(id_token.expiration.is_none());
        assert!(id_token.claims().nonce.is_none());
    }

    #[test]
    fn test_unusable_id_token_validity_is_invalid_client() {
        for seconds in [0, -3600, i64::MAX] {
            let client = client().with_id_token_validity(seconds);
            let err = enhancer()
                .enhance(access_token(), &context("openid", None), &client, T)
                .unwrap_err();
            assert!(matches!(err, IssuerError::InvalidClient { .. }), "{seconds}");
        }
    }

    #[test]
    fn test_extra_claims_cannot_shadow_stamped_claims() {
        let mut claims = AccessTokenClaims::default();
        claims
            .extra
            .insert("aud".to_string(), serde_json::Value::from("other-app"));
        claims
            .extra
            .insert("iss".to_string(), serde_json::Value::from("https://evil.example"));
        claims
            .extra
            .insert("tenant".to_string(), serde_json::Value::from("blue"));
        let token = AccessToken::new("acme-app", claims);

        let enhancer = enhancer();
        let token = enhancer
            .enhance(token, &context("profile", None), &client(), T)
            .unwrap();

        let decoded: Jwt<AccessTokenClaims> =
            enhancer.signing().decode(token.value().unwrap()).unwrap();
        assert_eq!(decoded.claims().aud.as_deref(), Some("acme-app"));
        assert_eq!(decoded.claims().iss.as_deref(), Some("https://op.example.com"));
        assert_eq!(decoded.claims().extra.len(), 1);
        assert_eq!(decoded.claims().extra["tenant"], "blue");
    }

    #[test]
    fn test_refresh_extra_nonce_does_not_duplicate_stamped_nonce() {
        let mut refresh_claims = AccessTokenClaims::default();
        refresh_claims
            .extra
            .insert("nonce".to_string(), serde_json::Value::from("stale"));
        let token = access_token().with_refresh_token(RefreshToken::new(refresh_claims));

        let token = enhancer()
            .enhance(token, &context("profile", None), &client(), T)
            .unwrap();
        let refresh = token.refresh_token.unwrap();
        assert!(refresh.claims().has_nonce());
        assert!(refresh.claims().extra.is_empty());
    }

    #[test]
    fn test_empty_nonce_not_echoed() {
        let token = enhancer()
            .enhance(access_token(), &context("openid", Some("")), &client(), T)
            .unwrap();
        assert!(token.id_token.unwrap().claims().nonce.is_none());
    }

    #[test]
    fn test_preferred_algorithm_signs_both_tokens() {
        let client = client().with_signing_algorithm(SigningAlgorithm::HS512);
        let token = enhancer()
            .enhance(access_token(), &context("openid", None), &client, T)
            .unwrap();
        assert_eq!(token.jwt.header().alg, SigningAlgorithm::HS512);
        assert_eq!(
            token.id_token.unwrap().jwt.header().alg,
            SigningAlgorithm::HS512
        );
    }

    #[test]
    fn test_unconfigured_preference_falls_back_to_default() {
        let client = client().with_signing_algorithm(SigningAlgorithm::HS384);
        let token = enhancer()
            .enhance(access_token(), &context("profile", None), &client, T)
            .unwrap();
        assert_eq!(token.jwt.header().alg, SigningAlgorithm::HS256);
    }

    #[test]
    fn test_openid_without_principal_is_invalid_grant() {
        let mut ctx = context("openid", None);
        ctx.principal = None;
        let err = enhancer()
            .enhance(access_token(), &ctx, &client(), T)
            .unwrap_err();
        assert!(matches!(err, IssuerError::InvalidGrant { .. }));
    }

    #[test]
    fn test_client_mismatch_is_invalid_client() {
        let err = enhancer()
            .enhance(
                access_token(),
                &context("openid", None),
                &ClientMetadata::new("other-app"),
                T,
            )
            .unwrap_err();
        assert!(matches!(err, IssuerError::InvalidClient { .. }));
    }

    #[test]
    fn test_signing_failure_aborts_issuance() {
        let enhancer = TokenEnhancer::new(
            "https://op.example.com",
            Arc::new(JwtSigningService::new(Arc::new(FailingSigner))),
        );
        let err = enhancer
            .enhance(access_token(), &context("openid", None), &client(), T)
            .unwrap_err();
        assert!(matches!(err, IssuerError::Signing { .. }));
    }
}
