//! `Authorization: Bearer <token>` extraction

use crate::error::{AuthError, AuthResult};

/// Pull the token out of an `Authorization` header value
///
/// The scheme is matched case-insensitively; the token is returned as-is.
///
/// # Errors
///
/// - [`AuthError::TokenMissing`] for an empty (or all-whitespace) value
/// - [`AuthError::TokenInvalid`] if the value is not exactly `<scheme> <token>`
///   with a `Bearer` scheme and a non-empty token
///
/// # Example
///
/// ```rust
/// use firebase_idtoken::bearer::extract_bearer;
///
/// assert_eq!(extract_bearer("Bearer eyJhbGciOi.x.y").unwrap(), "eyJhbGciOi.x.y");
/// assert!(extract_bearer("Basic dXNlcjpwYXNz").is_err());
/// ```
pub fn extract_bearer(header_value: &str) -> AuthResult<&str> {
    let value = header_value.trim();
    if value.is_empty() {
        return Err(AuthError::TokenMissing);
    }

    let Some((scheme, token)) = value.split_once(char::is_whitespace) else {
        return Err(AuthError::TokenInvalid(
            "expected `Bearer <token>`".to_string(),
        ));
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::TokenInvalid(format!(
            "unsupported authorization scheme {scheme:?}"
        )));
    }

    let token = token.trim_start();
    if token.is_empty() {
        return Err(AuthError::TokenInvalid("empty bearer token".to_string()));
    }
    if token.contains(char::is_whitespace) {
        return Err(AuthError::TokenInvalid(
            "bearer token must not contain whitespace".to_string(),
        ));
    }

    Ok(token)
}
