use chrono::{Duration, Utc};
use http::{Method, StatusCode};
use serde_json::Value;
use tucson::tucson_core::{GatewayConfig, Settings};
use tucson::tucson_security::{SessionClaims, SessionCodec};
use tucson::Gateway;
use tucson_test::{
    refused_url, MockBackend, MockProvider, TestApp, TEST_CLIENT_ID, TEST_CLIENT_SECRET,
};

const SIGNING_KEY: &str = "integration-secret";

struct Harness {
    _provider: MockProvider,
    web: MockBackend,
    api: MockBackend,
    app: TestApp,
}

async fn harness() -> Harness {
    let provider = MockProvider::start().await;
    let web = MockBackend::start().await;
    let api = MockBackend::start().await;
    let down = refused_url().await;

    let yaml = format!(
        r#"
default-origin: web
signing-key: {SIGNING_KEY}
oidc:
  issuer: {issuer}
  client-id: {TEST_CLIENT_ID}
  client-secret: {TEST_CLIENT_SECRET}
origins:
  web:
    url: {web}
  api:
    url: {api}
    oidc: true
    add_headers:
      X-Gateway: tucson
  down:
    url: {down}
matchers:
  - path: /api/*
    origin: api
  - path: /down/*
    origin: down
"#,
        issuer = provider.issuer(),
        web = web.url(),
        api = api.url(),
    );
    let settings = Settings::from_yaml_str(&yaml).unwrap();
    let config = GatewayConfig::from_settings(settings).unwrap();
    let gateway = Gateway::discover(config).await.unwrap();

    Harness {
        app: TestApp::new(gateway.router()),
        _provider: provider,
        web,
        api,
    }
}

fn session_token(secret: &str) -> String {
    let now = Utc::now();
    let claims = SessionClaims::new("jane@example.com", now, now + Duration::minutes(5));
    SessionCodec::new(secret).unwrap().mint(&claims).unwrap()
}

// ── Reserved routes ──

#[tokio::test]
async fn health_endpoints_report_up() {
    let h = harness().await;
    for path in ["/healthz", "/healthz/liveness", "/healthz/readiness"] {
        let resp = h.app.get(path).send().await.assert_ok();
        assert_eq!(resp.json::<Value>()["status"], "UP");
    }
    assert_eq!(h.web.request_count(), 0);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let h = harness().await;
    h.app.get("/hello").send().await.assert_ok();

    let resp = h.app.get("/metrics").send().await.assert_ok();
    let text = resp.text();
    assert!(text.contains(r#"tucson_http_requests_total{method="GET",path="/hello",status="200"} 1"#));
    assert!(!text.contains(r#"path="/metrics""#));
}

#[tokio::test]
async fn login_redirects_to_provider() {
    let h = harness().await;
    let resp = h
        .app
        .get("/auth/login")
        .send()
        .await
        .assert_status(StatusCode::FOUND);
    let location = resp.header("location").unwrap();
    assert!(location.contains("/authorize?"));
    assert!(location.contains("state=foobar"));
}

// ── Dispatch ──

#[tokio::test]
async fn unmatched_paths_go_to_default_origin() {
    let h = harness().await;
    let resp = h.app.get("/index.html?lang=en").send().await.assert_ok();
    assert_eq!(resp.text(), "backend ok");

    let seen = h.web.last_request().unwrap();
    assert_eq!(seen.uri.path(), "/index.html");
    assert_eq!(seen.uri.query(), Some("lang=en"));
    assert_eq!(seen.header("x-forwarded-for"), Some("127.0.0.1"));
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test]
async fn default_origin_accepts_any_method() {
    let h = harness().await;
    h.app
        .request(Method::OPTIONS, "/anything")
        .send()
        .await
        .assert_ok();
    assert_eq!(h.web.last_request().unwrap().method, Method::OPTIONS);
}

#[tokio::test]
async fn matched_paths_reject_other_methods() {
    let h = harness().await;
    let resp = h
        .app
        .request(Method::OPTIONS, "/api/items")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.header("allow"), Some("GET, POST, PUT, PATCH, DELETE"));
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test]
async fn protected_origin_without_cookie_redirects() {
    let h = harness().await;
    h.app
        .get("/api/items")
        .send()
        .await
        .assert_redirect_to("/auth/login");
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test]
async fn protected_origin_with_foreign_cookie_redirects() {
    let h = harness().await;
    h.app
        .get("/api/items")
        .cookie("jwt", &session_token("someone-else"))
        .send()
        .await
        .assert_redirect_to("/auth/login");
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test]
async fn protected_origin_with_valid_cookie_is_proxied() {
    let h = harness().await;
    h.app
        .post("/api/items")
        .cookie("jwt", &session_token(SIGNING_KEY))
        .body("payload")
        .send()
        .await
        .assert_ok();

    let seen = h.api.last_request().unwrap();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(&seen.body[..], b"payload");
    assert_eq!(seen.header("x-gateway"), Some("tucson"));
}

#[tokio::test]
async fn dot_segments_cannot_reach_protected_paths() {
    let h = harness().await;
    for path in [
        "/x/../api/items",
        "/x/%2e%2e/api/items",
        "/x/%2E./api/items",
        "/./api/items",
    ] {
        h.app
            .get(path)
            .send()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
    assert_eq!(h.web.request_count(), 0);
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test]
async fn encoded_segments_reach_backend_as_sent() {
    let h = harness().await;
    h.app
        .get("/docs/a%20b/%41..z/file.v2?q=%2e%2e")
        .send()
        .await
        .assert_ok();

    let seen = h.web.last_request().unwrap();
    assert_eq!(seen.uri.path(), "/docs/a%20b/%41..z/file.v2");
    assert_eq!(seen.uri.query(), Some("q=%2e%2e"));
}

#[tokio::test]
async fn unreachable_backend_is_503() {
    let h = harness().await;
    let resp = h
        .app
        .get("/down/status")
        .send()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.text(), "backend unavailable");
}

#[tokio::test]
async fn request_id_is_echoed_and_forwarded() {
    let h = harness().await;
    let resp = h.app.get("/").send().await.assert_ok();
    let id = resp.header("x-request-id").unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(h.web.last_request().unwrap().header("x-request-id"), Some(id.as_str()));

    let resp = h
        .app
        .get("/")
        .header("x-request-id", "from-client")
        .send()
        .await;
    assert_eq!(resp.header("x-request-id"), Some("from-client"));
}

// ── End to end ──

#[tokio::test]
async fn login_callback_then_proxied_request() {
    let h = harness().await;

    h.app
        .get("/api/profile")
        .send()
        .await
        .assert_redirect_to("/auth/login");

    let callback = h
        .app
        .get("/auth/callback?code=auth-code&state=foobar")
        .send()
        .await
        .assert_redirect_to("/");
    let set_cookie = callback.header("set-cookie").unwrap();
    let token = set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("jwt="))
        .unwrap()
        .to_string();

    h.app
        .get("/api/profile")
        .cookie("jwt", &token)
        .send()
        .await
        .assert_ok();
    assert_eq!(h.api.request_count(), 1);
    assert_eq!(h.api.last_request().unwrap().uri.path(), "/api/profile");
}

#[tokio::test]
async fn failed_callback_sets_no_cookie() {
    let h = harness().await;
    let resp = h.app.get("/auth/callback").send().await.assert_unauthorized();
    assert!(resp.header("set-cookie").is_none());
}
