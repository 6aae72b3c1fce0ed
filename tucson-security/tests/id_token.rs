use std::sync::Arc;

use serde_json::json;
use tucson_security::{IdTokenConfig, IdTokenVerifier, JwksCache, SecurityError};
use tucson_test::{now_secs, MockProvider, TestKeys, TEST_CLIENT_ID};

const ISSUER: &str = "https://idp.example.com";

fn static_verifier() -> IdTokenVerifier {
    IdTokenVerifier::new_with_static_key(
        TestKeys::shared().decoding_key(),
        IdTokenConfig::new("unused", ISSUER, TEST_CLIENT_ID),
    )
}

fn id_token(iss: &str, aud: &str, exp_offset: i64) -> String {
    let now = now_secs();
    TestKeys::shared().sign(&json!({
        "iss": iss,
        "aud": aud,
        "sub": "user-1",
        "iat": now,
        "exp": now + exp_offset,
    }))
}

#[tokio::test]
async fn accepts_valid_token() {
    let claims = static_verifier()
        .verify(&id_token(ISSUER, TEST_CLIENT_ID, 300))
        .await
        .unwrap();
    assert_eq!(claims["sub"], "user-1");
}

#[tokio::test]
async fn rejects_other_audience() {
    let err = static_verifier()
        .verify(&id_token(ISSUER, "another-client", 300))
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityError::ValidationFailed(msg) if msg.contains("audience")));
}

#[tokio::test]
async fn rejects_other_issuer() {
    let err = static_verifier()
        .verify(&id_token("https://evil.example.com", TEST_CLIENT_ID, 300))
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityError::ValidationFailed(msg) if msg.contains("issuer")));
}

#[tokio::test]
async fn rejects_expired_token() {
    let err = static_verifier()
        .verify(&id_token(ISSUER, TEST_CLIENT_ID, -3600))
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityError::TokenExpired));
}

#[tokio::test]
async fn rejects_hs256_token() {
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "iss": ISSUER, "aud": TEST_CLIENT_ID, "exp": now_secs() + 300 }),
        &jsonwebtoken::EncodingKey::from_secret(b"guess"),
    )
    .unwrap();
    let err = static_verifier().verify(&token).await.unwrap_err();
    assert!(matches!(err, SecurityError::ValidationFailed(_)));
}

#[tokio::test]
async fn verifies_against_provider_jwks() {
    let provider = MockProvider::start().await;
    let config = IdTokenConfig::new(
        format!("{}/jwks", provider.issuer()),
        provider.issuer(),
        TEST_CLIENT_ID,
    );
    let jwks = JwksCache::new(&config, reqwest::Client::new()).await.unwrap();
    let verifier = IdTokenVerifier::new(Arc::new(jwks), config);

    let claims = verifier
        .verify(&provider.id_token(TEST_CLIENT_ID, 300))
        .await
        .unwrap();
    assert_eq!(claims["iss"], provider.issuer());
}

#[tokio::test]
async fn unknown_kid_is_rejected() {
    let provider = MockProvider::start().await;
    let config = IdTokenConfig::new(
        format!("{}/jwks", provider.issuer()),
        provider.issuer(),
        TEST_CLIENT_ID,
    );
    let jwks = JwksCache::new(&config, reqwest::Client::new()).await.unwrap();
    let verifier = IdTokenVerifier::new(Arc::new(jwks), config);

    let now = now_secs();
    let token = TestKeys::shared().sign_with_kid(
        &json!({ "iss": provider.issuer(), "aud": TEST_CLIENT_ID, "exp": now + 300 }),
        "rotated-away",
    );
    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, SecurityError::UnknownKeyId(kid) if kid == "rotated-away"));
}

#[tokio::test]
async fn unreachable_jwks_fails_construction() {
    let url = format!("{}/jwks", tucson_test::refused_url().await);
    let config = IdTokenConfig::new(url, ISSUER, TEST_CLIENT_ID);
    let result = JwksCache::new(&config, reqwest::Client::new()).await;
    assert!(matches!(result, Err(SecurityError::JwksFetchError(_))));
}
