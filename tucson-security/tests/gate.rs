use std::sync::Arc;

use chrono::{Duration, Utc};
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};
use tucson_security::{AuthDecision, AuthGate, SecurityError, SessionClaims, SessionCodec};

fn gate(secret: &str) -> AuthGate {
    AuthGate::new(Arc::new(SessionCodec::new(secret).unwrap()))
}

fn cookie_headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
    headers
}

fn fresh_token(secret: &str) -> String {
    let now = Utc::now();
    SessionCodec::new(secret)
        .unwrap()
        .mint(&SessionClaims::new("jane@example.com", now, now + Duration::minutes(5)))
        .unwrap()
}

#[test]
fn proceeds_with_valid_cookie() {
    let token = fresh_token("k");
    let headers = cookie_headers(&format!("theme=dark; jwt={token}"));
    match gate("k").authorize(&headers) {
        AuthDecision::Proceed(claims) => assert_eq!(claims.subject, "jane@example.com"),
        other => panic!("expected Proceed, got {other:?}"),
    }
}

#[test]
fn missing_cookie_redirects() {
    assert!(matches!(
        gate("k").authorize(&HeaderMap::new()),
        AuthDecision::RedirectToLogin(SecurityError::MissingSessionCookie)
    ));
}

#[test]
fn foreign_signature_redirects() {
    let token = fresh_token("other");
    let headers = cookie_headers(&format!("jwt={token}"));
    assert!(matches!(
        gate("k").authorize(&headers),
        AuthDecision::RedirectToLogin(SecurityError::InvalidToken(_))
    ));
}

#[test]
fn expired_cookie_redirects() {
    let token = fresh_token("k");
    let headers = cookie_headers(&format!("jwt={token}"));
    let later = Utc::now() + Duration::minutes(6);
    assert!(matches!(
        gate("k").check_at(&headers, later),
        Err(SecurityError::TokenExpired)
    ));
}

#[test]
fn garbage_cookie_redirects() {
    let headers = cookie_headers("jwt=garbage");
    assert!(matches!(
        gate("k").authorize(&headers),
        AuthDecision::RedirectToLogin(_)
    ));
}
