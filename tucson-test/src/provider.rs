use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use http::StatusCode;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::keys::{now_secs, TestKeys};

pub const TEST_CLIENT_ID: &str = "tucson-gateway";
pub const TEST_CLIENT_SECRET: &str = "tucson-secret";

/// How the token endpoint answers the next exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenReply {
    /// Access token and a valid ID token.
    Success,
    /// An OAuth error with the given status.
    Error(StatusCode),
    /// A successful response carrying no `id_token`.
    WithoutIdToken,
    /// An ID token issued for another client.
    WrongAudience,
    /// An ID token that expired an hour ago.
    ExpiredIdToken,
    /// An access token that is not a JWT.
    OpaqueAccessToken,
}

/// Identity claims placed in issued access tokens.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    pub email: String,
    pub name: String,
    pub unique_name: String,
}

impl Default for TestIdentity {
    fn default() -> Self {
        Self {
            email: "jane@example.com".into(),
            name: "Jane Doe".into(),
            unique_name: "EXAMPLE\\jane".into(),
        }
    }
}

/// One call to the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchange {
    pub form: HashMap<String, String>,
    pub authorization: Option<String>,
}

struct ProviderState {
    issuer: String,
    keys: &'static TestKeys,
    reply: Mutex<TokenReply>,
    identity: Mutex<TestIdentity>,
    exchanges: Mutex<Vec<TokenExchange>>,
}

/// A loopback OpenID provider: discovery, JWKS and token endpoints.
///
/// ID tokens are signed with [`TestKeys::shared`] for [`TEST_CLIENT_ID`].
pub struct MockProvider {
    addr: SocketAddr,
    state: Arc<ProviderState>,
    handle: JoinHandle<()>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock provider");
        let addr = listener.local_addr().expect("mock provider has no address");

        let state = Arc::new(ProviderState {
            issuer: format!("http://{addr}"),
            keys: TestKeys::shared(),
            reply: Mutex::new(TokenReply::Success),
            identity: Mutex::new(TestIdentity::default()),
            exchanges: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(discovery))
            .route("/jwks", get(jwks))
            .route("/token", post(token))
            .with_state(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.state.issuer
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/authorize", self.state.issuer)
    }

    pub fn set_reply(&self, reply: TokenReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    pub fn set_identity(&self, identity: TestIdentity) {
        *self.state.identity.lock().unwrap() = identity;
    }

    pub fn exchanges(&self) -> Vec<TokenExchange> {
        self.state.exchanges.lock().unwrap().clone()
    }

    /// An RS256 ID token from this provider with the given audience and lifetime.
    pub fn id_token(&self, audience: &str, expires_in: i64) -> String {
        let now = now_secs();
        self.state.keys.sign(&json!({
            "iss": self.state.issuer,
            "aud": audience,
            "sub": "provider-subject-1",
            "iat": now,
            "exp": now + expires_in,
        }))
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn discovery(State(state): State<Arc<ProviderState>>) -> Json<Value> {
    let issuer = &state.issuer;
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "jwks_uri": format!("{issuer}/jwks"),
        "response_types_supported": ["code"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
    }))
}

async fn jwks(State(state): State<Arc<ProviderState>>) -> Json<Value> {
    Json(state.keys.jwks_json())
}

async fn token(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.exchanges.lock().unwrap().push(TokenExchange {
        form,
        authorization: headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let reply = state.reply.lock().unwrap().clone();
    let identity = state.identity.lock().unwrap().clone();
    let now = now_secs();

    let id_token = |aud: &str, exp: i64| {
        state.keys.sign(&json!({
            "iss": state.issuer,
            "aud": aud,
            "sub": "provider-subject-1",
            "iat": now,
            "exp": exp,
        }))
    };
    let access_token = encode(
        &Header::default(),
        &json!({
            "email": identity.email,
            "name": identity.name,
            "unique_name": identity.unique_name,
            "exp": now + 3600,
        }),
        &EncodingKey::from_secret(b"provider-internal"),
    )
    .expect("failed to sign access token");

    let body = match reply {
        TokenReply::Error(status) => {
            return (status, Json(json!({ "error": "invalid_grant" }))).into_response();
        }
        TokenReply::Success => json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "id_token": id_token(TEST_CLIENT_ID, now + 3600),
        }),
        TokenReply::WithoutIdToken => json!({
            "access_token": access_token,
            "token_type": "Bearer",
        }),
        TokenReply::WrongAudience => json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "id_token": id_token("someone-else", now + 3600),
        }),
        TokenReply::ExpiredIdToken => json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "id_token": id_token(TEST_CLIENT_ID, now - 3600),
        }),
        TokenReply::OpaqueAccessToken => json!({
            "access_token": "not-a-jwt",
            "token_type": "Bearer",
            "id_token": id_token(TEST_CLIENT_ID, now + 3600),
        }),
    };
    Json(body).into_response()
}
