mod app;
mod backend;
mod keys;
mod provider;

pub use app::{TestApp, TestRequest, TestResponse};
pub use backend::{refused_url, MockBackend, RecordedRequest};
pub use keys::{now_secs, TestKeys, TEST_KID};
pub use provider::{
    MockProvider, TestIdentity, TokenExchange, TokenReply, TEST_CLIENT_ID, TEST_CLIENT_SECRET,
};
