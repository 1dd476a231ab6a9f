//! Key retrieval over real HTTP against a wiremock endpoint

mod common;

use common::*;
use firebase_idtoken::keys::{KeyFetcher, ReqwestFetcher};
use firebase_idtoken::{AuthError, IdTokenVerifier, VerifierConfig};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CERTS_PATH: &str = "/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

async fn mock_certs(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn certs_response(max_age_secs: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(
            "cache-control",
            format!("public, max-age={max_age_secs}, must-revalidate, no-transform").as_str(),
        )
        .insert_header("content-type", "application/json; charset=UTF-8")
        .set_body_string(pem_map_body(&[
            (PRIMARY_KID, PRIMARY_CERT_PEM),
            (SECONDARY_KID, SECONDARY_CERT_PEM),
        ]))
}

fn http_verifier(server: &MockServer, timeout: Duration) -> IdTokenVerifier {
    let config = VerifierConfig::new(PROJECT_ID)
        .with_keys_url(format!("{}{CERTS_PATH}", server.uri()))
        .with_fetch_timeout(timeout);
    IdTokenVerifier::with_components(
        config,
        Arc::new(ReqwestFetcher::new().unwrap()),
        test_clock(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetcher_reports_status_body_and_cache_control() {
    let server = MockServer::start().await;
    mock_certs(&server, certs_response(19_800), 1).await;

    let fetcher = ReqwestFetcher::new().unwrap();
    let response = fetcher
        .fetch(&format!("{}{CERTS_PATH}", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(
        response.cache_control.as_deref(),
        Some("public, max-age=19800, must-revalidate, no-transform")
    );
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body.get(PRIMARY_KID).is_some());
}

#[tokio::test]
async fn test_verify_against_http_endpoint_caches_keys() {
    let server = MockServer::start().await;
    mock_certs(&server, certs_response(19_800), 1).await;
    let verifier = http_verifier(&server, Duration::from_secs(5));

    let token = signed_token(PRIMARY_KID, &valid_claims());
    for _ in 0..3 {
        let user = verifier.verify(&token).await.unwrap();
        assert_eq!(user.uid, "alice-uid");
    }

    let cached = verifier.key_cache().cached().unwrap();
    assert_eq!(cached.fetched_at().timestamp(), NOW);
    assert_eq!(cached.fresh_until().timestamp(), NOW + 19_800);
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn test_max_age_is_capped() {
    let server = MockServer::start().await;
    mock_certs(&server, certs_response(30 * 24 * 3600), 1).await;
    let verifier = http_verifier(&server, Duration::from_secs(5));

    verifier
        .verify(&signed_token(PRIMARY_KID, &valid_claims()))
        .await
        .unwrap();

    let cached = verifier.key_cache().cached().unwrap();
    assert_eq!(cached.fresh_until().timestamp(), NOW + 24 * 3600);
}

#[tokio::test]
async fn test_error_status_is_fetch_failure() {
    let server = MockServer::start().await;
    mock_certs(&server, ResponseTemplate::new(503), 1).await;
    let verifier = http_verifier(&server, Duration::from_secs(5));

    let err = verifier
        .verify(&signed_token(PRIMARY_KID, &valid_claims()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::KeyFetchFailed(_)), "got {err:?}");
    assert_eq!(err.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_slow_endpoint_is_fetch_failure() {
    let server = MockServer::start().await;
    mock_certs(
        &server,
        certs_response(3600).set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    let verifier = http_verifier(&server, Duration::from_millis(200));

    let err = verifier
        .verify(&signed_token(PRIMARY_KID, &valid_claims()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::KeyFetchFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_fetch_failure() {
    let config = VerifierConfig::new(PROJECT_ID)
        .with_keys_url(format!("http://127.0.0.1:1{CERTS_PATH}"))
        .with_fetch_timeout(Duration::from_secs(2));
    let verifier = IdTokenVerifier::with_components(
        config,
        Arc::new(ReqwestFetcher::new().unwrap()),
        test_clock(),
    )
    .unwrap();

    assert!(matches!(
        verifier.verify(&signed_token(PRIMARY_KID, &valid_claims())).await,
        Err(AuthError::KeyFetchFailed(_))
    ));
}
