use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use http::StatusCode;
use tucson_oidc::{
    discover, oidc_routes, OidcClient, OidcClientConfig, OidcError, OidcState,
};
use tucson_security::SessionCodec;
use tucson_test::{
    refused_url, MockProvider, TestApp, TestIdentity, TokenReply, TEST_CLIENT_ID,
    TEST_CLIENT_SECRET,
};
use url::Url;

const SECRET: &str = "session-secret";
const REDIRECT: &str = "http://localhost:8000/auth/callback";

async fn setup() -> (MockProvider, TestApp) {
    let provider = MockProvider::start().await;
    let config = OidcClientConfig::new(
        provider.issuer(),
        TEST_CLIENT_ID,
        TEST_CLIENT_SECRET,
        REDIRECT,
    )
    .with_scopes(["email".to_string()]);
    let client = OidcClient::discover(config).await.unwrap();
    let codec = Arc::new(SessionCodec::new(SECRET).unwrap());
    let router: Router = oidc_routes(Arc::new(OidcState::new(client, codec)));
    (provider, TestApp::new(router))
}

fn session_from(set_cookie: &str) -> String {
    let (pair, _) = set_cookie.split_once(';').unwrap();
    pair.strip_prefix("jwt=").unwrap().to_string()
}

// ── Discovery ──

#[tokio::test]
async fn discovery_reads_provider_endpoints() {
    let provider = MockProvider::start().await;
    let metadata = discover(&reqwest::Client::new(), provider.issuer())
        .await
        .unwrap();
    assert_eq!(metadata.token_endpoint, format!("{}/token", provider.issuer()));
    assert_eq!(metadata.jwks_uri, format!("{}/jwks", provider.issuer()));
}

#[tokio::test]
async fn discovery_rejects_issuer_mismatch() {
    let provider = MockProvider::start().await;
    let other = format!("http://localhost:{}", provider.addr().port());
    let err = discover(&reqwest::Client::new(), &other).await.unwrap_err();
    assert!(matches!(err, OidcError::Discovery(msg) if msg.contains("issuer")));
}

#[tokio::test]
async fn unreachable_provider_is_fatal() {
    let issuer = refused_url().await;
    let config = OidcClientConfig::new(issuer, TEST_CLIENT_ID, TEST_CLIENT_SECRET, REDIRECT);
    assert!(matches!(
        OidcClient::discover(config).await,
        Err(OidcError::Discovery(_))
    ));
}

// ── Login ──

#[tokio::test]
async fn login_redirects_to_provider() {
    let (provider, app) = setup().await;
    let resp = app
        .get("/auth/login")
        .send()
        .await
        .assert_status(StatusCode::FOUND);

    let location = Url::parse(resp.header("location").unwrap()).unwrap();
    assert!(location
        .as_str()
        .starts_with(&provider.authorization_endpoint()));
    let query: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["client_id"], TEST_CLIENT_ID);
    assert_eq!(query["redirect_uri"], REDIRECT);
    assert_eq!(query["scope"], "openid email");
    assert_eq!(query["state"], "foobar");
    assert!(resp.header("set-cookie").is_none());
}

// ── Callback ──

#[tokio::test]
async fn callback_sets_session_cookie() {
    let (provider, app) = setup().await;
    let resp = app
        .get("/auth/callback?code=abc&state=foobar")
        .send()
        .await
        .assert_redirect_to("/");

    let set_cookie = resp.header("set-cookie").unwrap().to_string();
    assert!(set_cookie.starts_with("jwt="));
    assert!(set_cookie.contains("; Path=/; Expires="));
    assert!(set_cookie.ends_with(" GMT"));

    let claims = SessionCodec::new(SECRET)
        .unwrap()
        .verify(&session_from(&set_cookie))
        .unwrap();
    assert_eq!(claims.subject, "jane@example.com");
    assert_eq!(claims.private_claim("name").unwrap(), "Jane Doe");
    assert_eq!(claims.private_claim("unique_name").unwrap(), "EXAMPLE\\jane");
    assert_eq!((claims.expiry - claims.not_before).num_seconds(), 300);

    let exchanges = provider.exchanges();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].form["grant_type"], "authorization_code");
    assert_eq!(exchanges[0].form["code"], "abc");
    assert_eq!(exchanges[0].form["redirect_uri"], REDIRECT);
    assert!(exchanges[0]
        .authorization
        .as_deref()
        .unwrap()
        .starts_with("Basic "));
}

#[tokio::test]
async fn callback_uses_current_identity() {
    let (provider, app) = setup().await;
    provider.set_identity(TestIdentity {
        email: "bob@example.com".into(),
        name: "Bob".into(),
        unique_name: "EXAMPLE\\bob".into(),
    });
    let resp = app.get("/auth/callback?code=x").send().await;
    let set_cookie = resp.header("set-cookie").unwrap().to_string();
    let claims = SessionCodec::new(SECRET)
        .unwrap()
        .verify(&session_from(&set_cookie))
        .unwrap();
    assert_eq!(claims.subject, "bob@example.com");
}

#[tokio::test]
async fn callback_without_code_is_unauthorized() {
    let (provider, app) = setup().await;
    let resp = app.get("/auth/callback").send().await.assert_unauthorized();
    assert!(resp.body.is_empty());
    assert!(provider.exchanges().is_empty());
}

#[tokio::test]
async fn provider_error_is_unauthorized() {
    let (provider, app) = setup().await;
    app.get("/auth/callback?error=access_denied&error_description=nope")
        .send()
        .await
        .assert_unauthorized();
    assert!(provider.exchanges().is_empty());
}

#[tokio::test]
async fn callback_failures_are_unauthorized() {
    let (provider, app) = setup().await;
    for reply in [
        TokenReply::Error(StatusCode::BAD_REQUEST),
        TokenReply::Error(StatusCode::INTERNAL_SERVER_ERROR),
        TokenReply::WithoutIdToken,
        TokenReply::WrongAudience,
        TokenReply::ExpiredIdToken,
        TokenReply::OpaqueAccessToken,
    ] {
        provider.set_reply(reply.clone());
        let resp = app.get("/auth/callback?code=abc").send().await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{reply:?}");
        assert!(resp.header("set-cookie").is_none(), "{reply:?}");
    }
}
