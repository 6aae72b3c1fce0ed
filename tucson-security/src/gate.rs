use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use http::header::LOCATION;
use http::{HeaderMap, StatusCode};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{SecurityError, TokenError};
use crate::token::{SessionClaims, SessionCodec};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "jwt";

/// Where unauthenticated browsers are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Value of the `jwt` cookie, if the request carries one.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
}

/// Session cookie for a freshly minted token, valid on every path until
/// `expires`.
pub fn build_session_cookie(
    token: &str,
    expires: DateTime<Utc>,
) -> Result<Cookie<'static>, TokenError> {
    let expires = OffsetDateTime::from_unix_timestamp(expires.timestamp())
        .map_err(|e| TokenError::InvalidClaims(format!("cookie expiry: {e}")))?;
    Ok(Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .expires(expires)
        .build())
}

/// 302 to the local login endpoint.
pub fn redirect_to_login() -> Response {
    (StatusCode::FOUND, [(LOCATION, LOGIN_PATH)]).into_response()
}

/// Outcome of checking a request against the gate.
#[derive(Debug)]
pub enum AuthDecision {
    Proceed(SessionClaims),
    RedirectToLogin(SecurityError),
}

/// Admits requests carrying a valid session cookie.
#[derive(Debug, Clone)]
pub struct AuthGate {
    codec: Arc<SessionCodec>,
}

impl AuthGate {
    pub fn new(codec: Arc<SessionCodec>) -> Self {
        Self { codec }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<SessionClaims, SecurityError> {
        self.check_at(headers, Utc::now())
    }

    pub fn check_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, SecurityError> {
        let token = session_cookie(headers).ok_or(SecurityError::MissingSessionCookie)?;
        self.codec.verify_at(&token, now)
    }

    /// Never fails with a 5xx: every verification error becomes a redirect.
    pub fn authorize(&self, headers: &HeaderMap) -> AuthDecision {
        match self.check(headers) {
            Ok(claims) => AuthDecision::Proceed(claims),
            Err(err) => {
                debug!(reason = %err, "Session rejected, redirecting to login");
                AuthDecision::RedirectToLogin(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::COOKIE;
    use http::HeaderValue;

    #[test]
    fn finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; jwtx=no"));
        headers.append(COOKIE, HeaderValue::from_static("lang=en; jwt=abc.def.ghi"));
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn quoted_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("jwt=\"abc.def.ghi\""));
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_format() {
        let expires = DateTime::parse_from_rfc3339("2021-01-02T16:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let cookie = build_session_cookie("tok", expires).unwrap();
        assert_eq!(
            cookie.to_string(),
            "jwt=tok; Path=/; Expires=Sat, 02 Jan 2021 16:04:05 GMT"
        );
        assert_eq!(cookie.http_only(), None);
    }

    #[test]
    fn redirect_is_found() {
        let resp = redirect_to_login();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[LOCATION], LOGIN_PATH);
    }
}
