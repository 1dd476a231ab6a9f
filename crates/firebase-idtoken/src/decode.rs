//! Structural decoding of compact-serialized ID tokens
//!
//! Splits `header.payload.signature`, base64url-decodes each segment and
//! parses header and payload. No I/O, no key material, no clock: decoding a
//! token says nothing about whether it is trustworthy.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::de::DeserializeOwned;

use crate::claims::{Header, IdTokenClaims};
use crate::error::{AuthError, AuthResult};

/// Upper bound on accepted token length
///
/// Real ID tokens are around 1 KiB; anything this large is not one.
pub const MAX_TOKEN_LEN: usize = 16 * 1024;

/// URL-safe alphabet that accepts segments with or without `=` padding
pub(crate) const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A structurally valid, not yet verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub header: Header,
    pub claims: IdTokenClaims,
    /// Raw signature bytes (empty for unsigned emulator tokens)
    pub signature: Vec<u8>,
    /// `header-segment "." payload-segment`, exactly as received
    pub signed_input: String,
}

impl DecodedToken {
    /// The signature re-encoded as an unpadded base64url string
    pub fn signature_b64(&self) -> String {
        BASE64_URL.encode(&self.signature)
    }
}

/// Decode a compact JWT into header, claims, signature and signed bytes
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token does not have exactly
/// three segments, a segment is not base64url, the header or payload is not
/// JSON, or a required claim is missing.
///
/// # Example
///
/// ```rust
/// use firebase_idtoken::decode::decode;
/// use firebase_idtoken::AuthError;
///
/// assert!(matches!(decode("abc"), Err(AuthError::MalformedToken(_))));
/// ```
pub fn decode(token: &str) -> AuthResult<DecodedToken> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(AuthError::MalformedToken(format!(
            "token is {} bytes, limit is {MAX_TOKEN_LEN}",
            token.len()
        )));
    }

    let mut segments = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 dot-separated segments, found {}",
            token.split('.').count()
        )));
    };

    let header: Header = parse_segment("header", header_b64)?;
    let claims: IdTokenClaims = parse_segment("payload", payload_b64)?;
    let signature = decode_segment("signature", signature_b64)?;

    Ok(DecodedToken {
        header,
        claims,
        signature,
        signed_input: token[..header_b64.len() + 1 + payload_b64.len()].to_string(),
    })
}

fn decode_segment(name: &str, segment: &str) -> AuthResult<Vec<u8>> {
    BASE64_URL
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{name} is not base64url: {e}")))
}

fn parse_segment<T: DeserializeOwned>(name: &str, segment: &str) -> AuthResult<T> {
    let bytes = decode_segment(name, segment)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        if e.is_data() {
            AuthError::MalformedToken(format!("{name} is missing or has an invalid claim: {e}"))
        } else {
            AuthError::MalformedToken(format!("{name} is not valid JSON: {e}"))
        }
    })
}
