use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use tucson_security::{build_session_cookie, SessionClaims, TokenError};

use crate::claims::IdentityClaims;
use crate::error::OidcError;
use crate::state::{OidcState, LOGIN_STATE};

/// Query string of the provider's redirect back to the gateway.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/login
pub(crate) async fn login(State(state): State<Arc<OidcState>>) -> Response {
    let url = state.client.authorize_url(LOGIN_STATE);
    debug!(url = %url, "Redirecting to provider");
    match HeaderValue::from_str(url.as_str()) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// GET /auth/callback
pub(crate) async fn callback(
    State(state): State<Arc<OidcState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, OidcError> {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or_default();
        return Err(OidcError::Provider(format!("{error} {detail}").trim_end().to_string()));
    }
    let code = params.code.filter(|c| !c.is_empty()).ok_or(OidcError::MissingCode)?;
    if params.state.as_deref() != Some(LOGIN_STATE) {
        debug!(state = ?params.state, "Callback state differs from the login state");
    }

    let token = state.client.exchange_code(&code).await?;
    let id_token = token
        .id_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(OidcError::MissingIdToken)?;
    state.client.verify_id_token(id_token).await?;
    let identity = IdentityClaims::decode_unverified(&token.access_token)?;

    let config = state.client.config();
    let now = Utc::now();
    let expiry = now + to_chrono(config.session_ttl)?;
    let claims = SessionClaims::new(&identity.email, now, expiry)
        .with_private_claims(&json!({
            "name": identity.name,
            "unique_name": identity.unique_name,
        }))
        .map_err(OidcError::Session)?;
    let session = state.codec.mint(&claims).map_err(OidcError::Session)?;

    let cookie = build_session_cookie(&session, now + to_chrono(config.cookie_ttl)?)
        .map_err(OidcError::Session)?;
    info!(subject = %identity.email, "Session established");

    Ok((
        StatusCode::FOUND,
        jar.add(cookie),
        [(LOCATION, HeaderValue::from_static("/"))],
    )
        .into_response())
}

fn to_chrono(ttl: std::time::Duration) -> Result<chrono::Duration, OidcError> {
    chrono::Duration::from_std(ttl)
        .map_err(|e| OidcError::Session(TokenError::InvalidClaims(e.to_string())))
}
