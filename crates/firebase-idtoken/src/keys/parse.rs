//! Key-set body parsing and freshness directives

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::SigningKey;
use crate::config::KeySetFormat;
use crate::error::{AuthError, AuthResult};

/// Longest freshness window honoured, whatever the endpoint says
pub const MAX_KEY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Parse a key-set response body into usable keys indexed by id
///
/// Individual keys that cannot be parsed are skipped with a warning so one bad
/// entry does not take down verification for every other key.
///
/// # Errors
///
/// Returns [`AuthError::KeyFetchFailed`] if the body is not in the expected
/// format or contains no usable key.
pub fn parse_key_set(
    body: &[u8],
    format: KeySetFormat,
) -> AuthResult<HashMap<String, Arc<SigningKey>>> {
    let keys = match format {
        KeySetFormat::X509Certificates => parse_pem_map(body)?,
        KeySetFormat::JwkSet => parse_jwk_set(body)?,
    };

    if keys.is_empty() {
        return Err(AuthError::KeyFetchFailed(
            "key set contains no usable keys".to_string(),
        ));
    }
    Ok(keys)
}

fn parse_pem_map(body: &[u8]) -> AuthResult<HashMap<String, Arc<SigningKey>>> {
    let entries: HashMap<String, String> = serde_json::from_slice(body)
        .map_err(|e| AuthError::KeyFetchFailed(format!("invalid key set body: {e}")))?;

    let mut keys = HashMap::with_capacity(entries.len());
    for (kid, pem) in entries {
        match DecodingKey::from_rsa_pem(pem.as_bytes()) {
            Ok(key) => {
                keys.insert(kid.clone(), Arc::new(SigningKey::new(kid, key)));
            }
            Err(e) => warn!(kid = %kid, error = %e, "Skipping unparsable PEM key"),
        }
    }
    Ok(keys)
}

fn parse_jwk_set(body: &[u8]) -> AuthResult<HashMap<String, Arc<SigningKey>>> {
    let jwks: JwkSet = serde_json::from_slice(body)
        .map_err(|e| AuthError::KeyFetchFailed(format!("invalid JWKS body: {e}")))?;

    let mut keys = HashMap::with_capacity(jwks.keys.len());
    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            warn!("Skipping JWK without kid");
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.clone(), Arc::new(SigningKey::new(kid, key)));
            }
            Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable JWK"),
        }
    }
    Ok(keys)
}

/// Freshness window from a `Cache-Control` value
///
/// `no-store`/`no-cache` mean zero freshness. `max-age` is capped at
/// [`MAX_KEY_TTL`]. Returns `None` when no usable directive is present.
pub fn parse_max_age(cache_control: &str) -> Option<Duration> {
    let mut max_age = None;
    for directive in cache_control.split(',') {
        let directive = directive.trim();
        let (name, value) = match directive.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
            None => (directive, None),
        };

        if name.eq_ignore_ascii_case("no-store") || name.eq_ignore_ascii_case("no-cache") {
            return Some(Duration::ZERO);
        }
        if name.eq_ignore_ascii_case("max-age")
            && let Some(secs) = value.and_then(|v| v.parse::<u64>().ok())
        {
            max_age = Some(Duration::from_secs(secs).min(MAX_KEY_TTL));
        }
    }
    max_age
}
