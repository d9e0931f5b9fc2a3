//! End-to-end authorization and token issuance through the `Issuer` facade.

mod common;

use std::collections::BTreeSet;

use common::{ISSUER, T0, fixture};
use oidc_issuer::{
    AccessToken, AccessTokenClaims, AuthenticationRef, AuthorizationParameters, ClientMetadata,
    ID_TOKEN_SCOPE, IdTokenClaims, IssuerError, Jwt, Principal, RefreshToken,
};
use tokio_test::{assert_err, assert_ok};

fn acme() -> ClientMetadata {
    ClientMetadata::new("acme-app")
        .with_name("Acme")
        .with_scopes(["openid", "email"])
        .with_id_token_validity(3600)
}

fn request(scope: &str, nonce: &str) -> AuthorizationParameters {
    AuthorizationParameters::new()
        .with("client_id", "acme-app")
        .with("scope", scope)
        .with("nonce", nonce)
        .with("state", "af0ifjsldkj")
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn issued_token(scope: &BTreeSet<String>) -> AccessToken {
    AccessToken::new(
        "acme-app",
        AccessTokenClaims {
            sub: Some("alice".to_string()),
            ..Default::default()
        },
    )
    .with_scope(scope.iter().cloned())
    .with_expiration(T0 + time::Duration::hours(1))
    .with_authentication(AuthenticationRef::new())
}

#[tokio::test]
async fn test_empty_scope_request_gets_no_id_token() {
    let f = fixture([acme()]);
    let alice = Principal::authenticated("alice");

    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("", "n1"), Some(&alice))
            .await
    );
    assert_eq!(ctx.granted_scopes, set(&["email"]));
    assert!(!ctx.is_openid());

    let token = assert_ok!(
        f.issuer
            .enhance_token(issued_token(&ctx.granted_scopes), &ctx)
            .await
    );
    assert!(token.id_token.is_none());
    assert!(token.value().is_some());
}

#[tokio::test]
async fn test_openid_request_gets_id_token() {
    let f = fixture([acme()]);
    let alice = Principal::authenticated("alice");

    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("openid email", "n1"), Some(&alice))
            .await
    );
    assert_eq!(ctx.granted_scopes, set(&["openid", "email"]));

    let parent = issued_token(&ctx.granted_scopes);
    let authentication = parent.authentication;
    let token = assert_ok!(f.issuer.enhance_token(parent, &ctx).await);

    let claims = token.claims();
    assert_eq!(claims.aud.as_deref(), Some("acme-app"));
    assert_eq!(claims.iss.as_deref(), Some(ISSUER));
    assert_eq!(claims.iat, Some(T0.unix_timestamp()));

    let id_token = token.id_token.as_ref().expect("id token attached");
    assert_eq!(id_token.claims().sub, "alice");
    assert_eq!(id_token.claims().aud, "acme-app");
    assert_eq!(id_token.claims().nonce.as_deref(), Some("n1"));
    assert_eq!(
        id_token.claims().exp,
        Some((T0 + time::Duration::seconds(3600)).unix_timestamp())
    );
    assert_eq!(id_token.expiration, Some(T0 + time::Duration::seconds(3600)));
    assert_eq!(id_token.scope, set(&[ID_TOKEN_SCOPE]));
    assert_eq!(id_token.authentication, authentication);

    let signing = f.issuer.enhancer().signing();
    let decoded: Jwt<IdTokenClaims> = assert_ok!(signing.decode(id_token.value().unwrap()));
    assert_eq!(decoded.claims().iss, ISSUER);
    let decoded: Jwt<AccessTokenClaims> = assert_ok!(signing.decode(token.value().unwrap()));
    assert_eq!(decoded.claims().aud.as_deref(), Some("acme-app"));
}

#[tokio::test]
async fn test_replayed_nonce_is_rejected_until_expiry() {
    let f = fixture([acme()]);
    let alice = Principal::authenticated("alice");
    let params = request("openid", "abc");

    assert_ok!(
        f.issuer
            .validate_authorization_request(&params, Some(&alice))
            .await
    );

    f.clock.advance(time::Duration::seconds(299));
    let err = assert_err!(
        f.issuer
            .validate_authorization_request(&params, Some(&alice))
            .await
    );
    assert!(matches!(err, IssuerError::NonceReplay { .. }));
    assert_eq!(err.oauth_error_code(), "invalid_request");
    assert!(!err.to_string().contains("abc"));

    f.clock.advance(time::Duration::seconds(1));
    assert_ok!(
        f.issuer
            .validate_authorization_request(&params, Some(&alice))
            .await
    );
    assert_eq!(f.nonces.len(), 2);
}

#[tokio::test]
async fn test_pre_login_request_does_not_record_nonce() {
    let f = fixture([acme()]);
    let params = request("openid", "abc");

    assert_ok!(f.issuer.validate_authorization_request(&params, None).await);
    assert_eq!(f.nonces.len(), 0);

    let alice = Principal::authenticated("alice");
    assert_ok!(
        f.issuer
            .validate_authorization_request(&params, Some(&alice))
            .await
    );
    assert_eq!(f.nonces.len(), 1);
}

#[tokio::test]
async fn test_unregistered_scope_is_rejected() {
    let f = fixture([ClientMetadata::new("acme-app").with_scopes(["profile"])]);
    let params = AuthorizationParameters::new()
        .with("client_id", "acme-app")
        .with("scope", "profile email");

    let err = assert_err!(f.issuer.validate_authorization_request(&params, None).await);
    match err {
        IssuerError::InvalidScope {
            scope,
            valid_scopes,
        } => {
            assert_eq!(scope, "email");
            assert_eq!(valid_scopes, vec!["profile"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_client_is_rejected_at_both_steps() {
    let f = fixture([acme()]);
    let params = AuthorizationParameters::new().with("client_id", "ghost");
    let err = assert_err!(f.issuer.validate_authorization_request(&params, None).await);
    assert_eq!(err.oauth_error_code(), "invalid_client");

    let alice = Principal::authenticated("alice");
    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("email", "n2"), Some(&alice))
            .await
    );

    let mut moved = ctx.clone();
    moved.client_id = "ghost".to_string();
    let err = assert_err!(
        f.issuer
            .enhance_token(issued_token(&ctx.granted_scopes), &moved)
            .await
    );
    assert!(matches!(err, IssuerError::InvalidClient { .. }));
}

#[tokio::test]
async fn test_client_registered_later_is_resolved() {
    let f = fixture(Vec::<ClientMetadata>::new());
    let params = AuthorizationParameters::new().with("client_id", "late-app");
    assert_err!(f.issuer.validate_authorization_request(&params, None).await);

    f.clients.register(ClientMetadata::new("late-app"));
    assert_ok!(f.issuer.validate_authorization_request(&params, None).await);
}

#[tokio::test]
async fn test_refresh_token_receives_correlation_nonce() {
    let f = fixture([acme()]);
    let alice = Principal::authenticated("alice");
    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("email", "n3"), Some(&alice))
            .await
    );

    let token = issued_token(&ctx.granted_scopes)
        .with_refresh_token(RefreshToken::new(AccessTokenClaims::default()));
    let token = assert_ok!(f.issuer.enhance_token(token, &ctx).await);

    assert!(token.jwt.claims().has_nonce());
    let refresh = token.refresh_token.expect("refresh token kept");
    assert!(refresh.claims().has_nonce());
}

#[tokio::test]
async fn test_out_of_range_id_token_validity_is_rejected() {
    // Registered directly, bypassing `ClientMetadata::validate`.
    let f = fixture([
        ClientMetadata::new("acme-app")
            .with_scopes(["openid"])
            .with_id_token_validity(i64::MAX),
    ]);
    let alice = Principal::authenticated("alice");
    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("openid", "n4"), Some(&alice))
            .await
    );

    let err = assert_err!(
        f.issuer
            .enhance_token(issued_token(&ctx.granted_scopes), &ctx)
            .await
    );
    assert!(matches!(err, IssuerError::InvalidClient { .. }));

    f.clients.register(
        ClientMetadata::new("acme-app")
            .with_scopes(["openid"])
            .with_id_token_validity(-3600),
    );
    let err = assert_err!(
        f.issuer
            .enhance_token(issued_token(&ctx.granted_scopes), &ctx)
            .await
    );
    assert!(matches!(err, IssuerError::InvalidClient { .. }));
}

#[tokio::test]
async fn test_stamped_audience_wins_over_extra_claim() {
    let f = fixture([acme()]);
    let alice = Principal::authenticated("alice");
    let ctx = assert_ok!(
        f.issuer
            .validate_authorization_request(&request("email", "n5"), Some(&alice))
            .await
    );

    let mut token = issued_token(&ctx.granted_scopes);
    token
        .jwt
        .claims_mut()
        .extra
        .insert("aud".to_string(), serde_json::Value::from("other-app"));
    let token = assert_ok!(f.issuer.enhance_token(token, &ctx).await);

    let value = token.value().unwrap();
    let decoded: Jwt<AccessTokenClaims> =
        assert_ok!(f.issuer.enhancer().signing().decode(value));
    assert_eq!(decoded.claims().aud.as_deref(), Some("acme-app"));
    assert!(decoded.claims().extra.is_empty());
}

#[test]
fn test_default_config_is_rejected_at_startup() {
    let err = assert_err!(oidc_issuer::IssuerConfig::default().validate());
    assert!(err.to_string().contains("issuer"));

    let mut config = oidc_issuer::IssuerConfig::default();
    config.issuer = ISSUER.to_string();
    let err = assert_err!(config.validate());
    assert!(err.to_string().contains("signing.secret"));
}
