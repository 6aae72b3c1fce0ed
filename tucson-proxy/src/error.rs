use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body returned when the backend cannot be reached.
pub const UNAVAILABLE_BODY: &str = "backend unavailable";

#[derive(Debug)]
pub enum ProxyError {
    /// Connection refused, TLS failure, DNS failure or timeout.
    Unavailable(String),
    /// The request path cannot be forwarded unchanged.
    InvalidPath(String),
    /// The outbound request could not be built.
    InvalidRequest(String),
    /// An upstream client could not be constructed.
    Client(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidRequest(_) | ProxyError::Client(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::Unavailable(msg) => write!(f, "Backend unavailable: {msg}"),
            ProxyError::InvalidPath(path) => write!(f, "Path has dot segments: {path}"),
            ProxyError::InvalidRequest(msg) => write!(f, "Invalid upstream request: {msg}"),
            ProxyError::Client(msg) => write!(f, "Cannot build upstream client: {msg}"),
        }
    }
}

impl std::error::Error for ProxyError {}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                UNAVAILABLE_BODY,
            )
                .into_response(),
            other => other.status_code().into_response(),
        }
    }
}
