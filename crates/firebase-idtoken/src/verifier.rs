//! ID token verification
//!
//! [`IdTokenVerifier`] runs the full pipeline for one token:
//!
//! 1. decode the three segments
//! 2. check the header algorithm against the mode (`RS256`, or `none` in
//!    emulator mode)
//! 3. resolve the signing key named by `kid` (skipped in emulator mode)
//! 4. verify the RS256 signature over the original `header.payload` bytes
//!    (skipped in emulator mode)
//! 5. validate claims in a fixed order: `exp`, `iat`, `auth_time`, `aud`,
//!    `iss`, `sub`
//! 6. flatten the claims into a [`VerifiedToken`]
//!
//! A [`VerifiedToken`] is only returned when every applicable step passed.

use jsonwebtoken::Algorithm;
use std::sync::Arc;
use tracing::debug;

use crate::bearer::extract_bearer;
use crate::claims::{IdTokenClaims, VerifiedToken, timestamp};
use crate::clock::{Clock, SystemClock};
use crate::config::VerifierConfig;
use crate::decode::{DecodedToken, decode};
use crate::error::{AuthError, AuthResult, TimeClaim};
use crate::keys::{KeyCache, KeyFetcher, ReqwestFetcher};

/// Firebase ID token verifier
///
/// Cheap to share behind an `Arc`; all state is either immutable
/// configuration or the internally synchronized [`KeyCache`].
///
/// # Example
///
/// ```rust,no_run
/// # use firebase_idtoken::{IdTokenVerifier, VerifierConfig};
/// # tokio_test::block_on(async {
/// let verifier = IdTokenVerifier::new(VerifierConfig::new("my-project"))?;
///
/// match verifier.verify_from_header("Bearer eyJhbGciOiJSUzI1NiIs...").await {
///     Ok(user) => println!("authenticated {}", user.uid),
///     Err(e) => println!("rejected: {e}"),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct IdTokenVerifier {
    config: Arc<VerifierConfig>,
    keys: KeyCache,
    clock: Arc<dyn Clock>,
}

impl IdTokenVerifier {
    /// Create a verifier that fetches keys over HTTPS and reads the system clock
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if the configuration is invalid or
    /// the HTTP client cannot be created.
    pub fn new(config: VerifierConfig) -> AuthResult<Self> {
        let fetcher = ReqwestFetcher::new()
            .map_err(|e| AuthError::InvalidConfig(format!("key fetcher: {e}")))?;
        Self::with_components(config, Arc::new(fetcher), Arc::new(SystemClock))
    }

    /// Create a verifier with an explicit transport and time source
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if the configuration is invalid.
    pub fn with_components(
        config: VerifierConfig,
        fetcher: Arc<dyn KeyFetcher>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let keys = KeyCache::new(Arc::clone(&config), fetcher, Arc::clone(&clock));
        Ok(Self {
            config,
            keys,
            clock,
        })
    }

    /// Verify a raw ID token
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AuthError`]:
    /// - [`AuthError::MalformedToken`] - not a decodable token, or `kid`
    ///   missing outside emulator mode
    /// - [`AuthError::AlgorithmMismatch`] - wrong `alg` for the mode
    /// - [`AuthError::KeyNotFound`] / [`AuthError::KeyFetchFailed`] - key lookup
    /// - [`AuthError::SignatureInvalid`] - signature does not verify
    /// - [`AuthError::TokenExpired`], [`AuthError::TokenNotYetValid`],
    ///   [`AuthError::InvalidAudience`], [`AuthError::InvalidIssuer`],
    ///   [`AuthError::SubjectMissing`] - claim checks
    pub async fn verify(&self, token: &str) -> AuthResult<VerifiedToken> {
        let result = self.verify_inner(token).await;
        match &result {
            Ok(verified) => debug!(uid = %verified.uid, "ID token verified"),
            Err(e) => debug!(kind = e.kind(), error = %e, "ID token rejected"),
        }
        result
    }

    /// Extract a bearer token from an `Authorization` header value and verify it
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenMissing`] or [`AuthError::TokenInvalid`] for a bad
    /// header, otherwise anything [`IdTokenVerifier::verify`] returns.
    pub async fn verify_from_header(&self, header_value: &str) -> AuthResult<VerifiedToken> {
        let token = extract_bearer(header_value)?;
        self.verify(token).await
    }

    async fn verify_inner(&self, token: &str) -> AuthResult<VerifiedToken> {
        let decoded = decode(token)?;

        self.check_algorithm(&decoded)?;

        if !self.config.emulator_mode {
            self.verify_signature(&decoded).await?;
        }

        self.validate_claims(&decoded.claims)?;

        Ok(VerifiedToken::from_claims(decoded.claims))
    }

    fn check_algorithm(&self, decoded: &DecodedToken) -> AuthResult<()> {
        let expected = self.config.required_algorithm();
        if decoded.header.alg != expected {
            return Err(AuthError::AlgorithmMismatch {
                expected: expected.to_string(),
                actual: decoded.header.alg.clone(),
            });
        }
        Ok(())
    }

    async fn verify_signature(&self, decoded: &DecodedToken) -> AuthResult<()> {
        let kid = decoded
            .header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::MalformedToken("header has no kid".to_string()))?;

        let key = self.keys.resolve_key(kid).await?;

        if decoded.signature.is_empty() {
            return Err(AuthError::SignatureInvalid);
        }

        match jsonwebtoken::crypto::verify(
            &decoded.signature_b64(),
            decoded.signed_input.as_bytes(),
            key.decoding_key(),
            Algorithm::RS256,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::SignatureInvalid),
            Err(e) => {
                debug!(kid = %kid, error = %e, "Signature verification errored");
                Err(AuthError::SignatureInvalid)
            }
        }
    }

    fn validate_claims(&self, claims: &IdTokenClaims) -> AuthResult<()> {
        let now = self.clock.now().timestamp();
        let skew = i64::try_from(self.config.clock_skew.as_secs()).unwrap_or(i64::MAX);

        if claims.exp < now.saturating_sub(skew) {
            return Err(AuthError::TokenExpired(timestamp(claims.exp)));
        }
        let latest_valid = now.saturating_add(skew);
        if claims.iat > latest_valid {
            return Err(AuthError::TokenNotYetValid(TimeClaim::IssuedAt));
        }
        if claims.auth_time > latest_valid {
            return Err(AuthError::TokenNotYetValid(TimeClaim::AuthTime));
        }
        if claims.aud != self.config.expected_audience {
            return Err(AuthError::InvalidAudience {
                expected: self.config.expected_audience.clone(),
                actual: claims.aud.clone(),
            });
        }
        if claims.iss != self.config.expected_issuer {
            return Err(AuthError::InvalidIssuer {
                expected: self.config.expected_issuer.clone(),
                actual: claims.iss.clone(),
            });
        }
        if claims.sub.is_empty() {
            return Err(AuthError::SubjectMissing);
        }
        Ok(())
    }

    /// The verifier's configuration
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The shared signing-key cache
    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::keys::{FetchError, FetchResponse};
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    #[derive(Debug)]
    struct UnreachableFetcher;

    #[async_trait::async_trait]
    impl KeyFetcher for UnreachableFetcher {
        async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            Err(FetchError::Transport("no network in unit tests".into()))
        }
    }

    fn verifier(config: VerifierConfig) -> IdTokenVerifier {
        IdTokenVerifier::with_components(
            config,
            Arc::new(UnreachableFetcher),
            Arc::new(ManualClock::from_timestamp(NOW)),
        )
        .unwrap()
    }

    fn claims() -> IdTokenClaims {
        IdTokenClaims {
            exp: NOW + 3600,
            iat: NOW - 10,
            aud: "demo".into(),
            iss: "https://securetoken.google.com/demo".into(),
            sub: "u1".into(),
            auth_time: NOW - 20,
            email: None,
            email_verified: None,
            name: None,
            picture: None,
            phone_number: None,
            firebase: None,
        }
    }

    #[test]
    fn test_valid_claims_pass() {
        assert!(verifier(VerifierConfig::new("demo")).validate_claims(&claims()).is_ok());
    }

    #[test]
    fn test_expiry_boundary() {
        let v = verifier(VerifierConfig::new("demo"));

        let mut c = claims();
        c.exp = NOW;
        assert!(v.validate_claims(&c).is_ok(), "exp == now is still valid");

        c.exp = NOW - 1;
        match v.validate_claims(&c) {
            Err(AuthError::TokenExpired(at)) => assert_eq!(at.timestamp(), NOW - 1),
            other => panic!("expected TokenExpired, got {other:?}"),
        }
    }

    #[test]
    fn test_clock_skew_applies_to_all_time_claims() {
        let v = verifier(VerifierConfig::new("demo").with_clock_skew(Duration::from_secs(30)));

        let mut c = claims();
        c.exp = NOW - 30;
        c.iat = NOW + 30;
        c.auth_time = NOW + 30;
        assert!(v.validate_claims(&c).is_ok());

        c.iat = NOW + 31;
        assert_eq!(
            v.validate_claims(&c),
            Err(AuthError::TokenNotYetValid(TimeClaim::IssuedAt))
        );

        c.iat = NOW;
        c.auth_time = NOW + 31;
        assert_eq!(
            v.validate_claims(&c),
            Err(AuthError::TokenNotYetValid(TimeClaim::AuthTime))
        );
    }

    #[test]
    fn test_audience_checked_before_issuer() {
        let v = verifier(VerifierConfig::new("demo"));
        let mut c = claims();
        c.aud = "other".into();
        c.iss = "https://evil.example.com".into();
        c.sub = String::new();
        assert_eq!(
            v.validate_claims(&c),
            Err(AuthError::InvalidAudience {
                expected: "demo".into(),
                actual: "other".into(),
            })
        );
    }

    #[test]
    fn test_issuer_and_subject() {
        let v = verifier(VerifierConfig::new("demo"));

        let mut c = claims();
        c.iss = "https://securetoken.google.com/other".into();
        assert!(matches!(
            v.validate_claims(&c),
            Err(AuthError::InvalidIssuer { .. })
        ));

        let mut c = claims();
        c.sub = String::new();
        assert_eq!(v.validate_claims(&c), Err(AuthError::SubjectMissing));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = IdTokenVerifier::with_components(
            VerifierConfig::new(""),
            Arc::new(UnreachableFetcher),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(AuthError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_header_errors_short_circuit() {
        let v = verifier(VerifierConfig::new("demo"));
        assert_eq!(v.verify_from_header("").await, Err(AuthError::TokenMissing));
        assert!(matches!(
            v.verify_from_header("Basic xyz").await,
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            v.verify_from_header("Bearer abc").await,
            Err(AuthError::MalformedToken(_))
        ));
    }
}
