//! Common test utilities for integration tests
//!
//! Provides RSA key fixtures, a scriptable key fetcher, and helpers that sign
//! ID tokens the way the Firebase issuer does.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use firebase_idtoken::keys::{FetchError, FetchResponse, KeyFetcher};
use firebase_idtoken::{IdTokenVerifier, ManualClock, VerifierConfig};
use jsonwebtoken::{Algorithm, EncodingKey};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const PROJECT_ID: &str = "demo-project";
pub const ISSUER: &str = "https://securetoken.google.com/demo-project";

/// Fixed "now" used by every test clock
pub const NOW: i64 = 1_700_000_000;

pub const PRIMARY_KID: &str = "primary-kid";
pub const SECONDARY_KID: &str = "secondary-kid";

pub const PRIMARY_PRIVATE_PEM: &str = include_str!("../fixtures/primary_private.pem");
pub const PRIMARY_CERT_PEM: &str = include_str!("../fixtures/primary_cert.pem");
pub const PRIMARY_MODULUS: &str = include_str!("../fixtures/primary_modulus.txt");

pub const SECONDARY_PRIVATE_PEM: &str = include_str!("../fixtures/secondary_private.pem");
pub const SECONDARY_CERT_PEM: &str = include_str!("../fixtures/secondary_cert.pem");
pub const SECONDARY_MODULUS: &str = include_str!("../fixtures/secondary_modulus.txt");

/// Key fetcher with a swappable response, optional latency and a call counter
#[derive(Debug)]
pub struct MockFetcher {
    calls: AtomicUsize,
    delay: Mutex<Duration>,
    response: Mutex<Result<FetchResponse, FetchError>>,
}

impl MockFetcher {
    /// Serve the given response on every call
    pub fn serving(response: FetchResponse) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
            response: Mutex::new(Ok(response)),
        })
    }

    /// Fail every call with the given error
    pub fn failing(error: FetchError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
            response: Mutex::new(Err(error)),
        })
    }

    /// Serve a PEM map of the given certificates with `max-age`
    pub fn with_certs(certs: &[(&str, &str)], max_age_secs: u64) -> Arc<Self> {
        Self::serving(pem_map_response(certs, max_age_secs))
    }

    pub fn set_response(&self, response: Result<FetchResponse, FetchError>) {
        *self.response.lock() = response;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of fetches started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for MockFetcher {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().clone()
    }
}

/// JSON object of `kid -> PEM certificate`, as the x509 endpoint publishes it
pub fn pem_map_body(certs: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, Value> = certs
        .iter()
        .map(|(kid, pem)| ((*kid).to_string(), Value::String((*pem).to_string())))
        .collect();
    Value::Object(map).to_string()
}

pub fn pem_map_response(certs: &[(&str, &str)], max_age_secs: u64) -> FetchResponse {
    let cache_control = format!("public, max-age={max_age_secs}, must-revalidate, no-transform");
    FetchResponse::ok(pem_map_body(certs), Some(&cache_control))
}

/// JWK set for the given `(kid, modulus)` pairs
pub fn jwk_set_body(keys: &[(&str, &str)]) -> String {
    let keys: Vec<Value> = keys
        .iter()
        .map(|(kid, n)| {
            json!({
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": kid,
                "n": n.trim(),
                "e": "AQAB",
            })
        })
        .collect();
    json!({ "keys": keys }).to_string()
}

/// Claims of a token that is valid at [`NOW`] for [`PROJECT_ID`]
pub fn valid_claims() -> Value {
    json!({
        "iss": ISSUER,
        "aud": PROJECT_ID,
        "auth_time": NOW - 120,
        "user_id": "alice-uid",
        "sub": "alice-uid",
        "iat": NOW - 60,
        "exp": NOW + 3540,
        "email": "alice@example.com",
        "email_verified": true,
        "name": "Alice",
        "firebase": {
            "identities": { "email": ["alice@example.com"] },
            "sign_in_provider": "password"
        }
    })
}

pub fn rs256_header(kid: &str) -> Value {
    json!({ "alg": "RS256", "kid": kid, "typ": "JWT" })
}

/// Sign raw header and payload JSON text with an RSA private key
///
/// The payload is encoded exactly as given, so tests control byte order and
/// escaping of the signed input.
pub fn sign_raw(header_json: &str, payload_json: &str, private_pem: &str) -> String {
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture key parses");
    let signature = jsonwebtoken::crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)
        .expect("signing succeeds");
    format!("{signing_input}.{signature}")
}

/// RS256 token signed by the primary fixture key under `kid`
pub fn signed_token(kid: &str, claims: &Value) -> String {
    sign_raw(&rs256_header(kid).to_string(), &claims.to_string(), PRIMARY_PRIVATE_PEM)
}

/// Unsigned emulator token
pub fn unsigned_token(claims: &Value) -> String {
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::from_timestamp(NOW))
}

/// Production-mode verifier over the given fetcher and clock
pub fn verifier(fetcher: Arc<MockFetcher>, clock: Arc<ManualClock>) -> IdTokenVerifier {
    verifier_with_config(VerifierConfig::new(PROJECT_ID), fetcher, clock)
}

pub fn verifier_with_config(
    config: VerifierConfig,
    fetcher: Arc<MockFetcher>,
    clock: Arc<ManualClock>,
) -> IdTokenVerifier {
    IdTokenVerifier::with_components(config, fetcher, clock).expect("valid test config")
}
