use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use serde_json::{json, Value};

/// Key ID published for [`TestKeys::shared`].
pub const TEST_KID: &str = "tucson-test-key";

/// RSA key pair for signing ID tokens and publishing them as a JWKS.
pub struct TestKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    n: String,
    e: String,
    kid: String,
}

impl TestKeys {
    /// Generate a new RSA-2048 key pair.
    pub fn generate(kid: &str) -> Self {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA-2048 key");
        let public_key = RsaPublicKey::from(&private_key);

        let pkcs8_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("failed to export RSA key as PKCS8 PEM");
        let encoding_key = EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes())
            .expect("failed to create EncodingKey from RSA PEM");

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .expect("failed to create DecodingKey from RSA components");

        Self {
            encoding_key,
            decoding_key,
            n,
            e,
            kid: kid.to_string(),
        }
    }

    /// One key pair per test binary; RSA generation is slow.
    pub fn shared() -> &'static TestKeys {
        static KEYS: OnceLock<TestKeys> = OnceLock::new();
        KEYS.get_or_init(|| TestKeys::generate(TEST_KID))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn decoding_key(&self) -> DecodingKey {
        self.decoding_key.clone()
    }

    /// Sign `claims` with RS256 under this key's `kid`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        self.sign_with_kid(claims, &self.kid)
    }

    pub fn sign_with_kid<T: Serialize>(&self, claims: &T, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding_key).expect("failed to sign test token")
    }

    /// JWKS document publishing the public key.
    pub fn jwks_json(&self) -> Value {
        json!({
            "keys": [{
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": self.kid,
                "n": self.n,
                "e": self.e,
            }]
        })
    }
}

/// Current UNIX time in seconds.
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
