pub mod config;
pub mod error;
pub mod gate;
pub mod id_token;
pub mod jwks;
pub mod token;

pub use config::IdTokenConfig;
pub use error::{SecurityError, TokenError};
pub use gate::{
    build_session_cookie, redirect_to_login, session_cookie, AuthDecision, AuthGate, LOGIN_PATH,
    SESSION_COOKIE,
};
pub use id_token::IdTokenVerifier;
pub use jwks::JwksCache;
pub use token::{SessionClaims, SessionCodec};
