//! Token header, claim set and the verified output view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;


/// JOSE header of an ID token
///
/// `alg` is kept as a plain string: emulator tokens carry `none`, which a
/// strict algorithm enum would refuse to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm (`RS256` in production, `none` from the emulator)
    pub alg: String,
    /// Id of the issuer key that signed the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Token type, normally `JWT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Firebase-specific provider block (`firebase` claim)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseInfo {
    /// Provider the user signed in with (`password`, `google.com`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_provider: Option<String>,
    /// Second factor used, if multi-factor sign-in happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_second_factor: Option<String>,
    /// Identifier of that second factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_factor_identifier: Option<String>,
    /// Identity Platform tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Linked identities, keyed by provider
    #[serde(default)]
    pub identities: HashMap<String, Vec<String>>,
}

/// Claim set of an ID token
///
/// Deserialization fails when a required claim is absent, which the decoder
/// reports as [`AuthError::MalformedToken`](crate::error::AuthError::MalformedToken).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Expiration time (epoch seconds)
    pub exp: i64,
    /// Issued-at time (epoch seconds)
    pub iat: i64,
    /// Audience: the project id
    pub aud: String,
    /// Issuer
    pub iss: String,
    /// Subject: the user id
    pub sub: String,
    /// Time the user authenticated (epoch seconds)
    pub auth_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase: Option<FirebaseInfo>,
}

/// A fully verified ID token
///
/// Only ever produced after the signature (outside emulator mode) and every
/// claim check succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedToken {
    /// User id (`sub`)
    pub uid: String,
    pub email: Option<String>,
    /// `email_verified`, `false` when absent
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub phone_number: Option<String>,
    pub auth_time: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sign_in_provider: Option<String>,
    pub tenant_id: Option<String>,
}

impl VerifiedToken {
    /// Flatten validated claims into the public view
    pub(crate) fn from_claims(claims: IdTokenClaims) -> Self {
        let firebase = claims.firebase.unwrap_or_default();
        Self {
            auth_time: timestamp(claims.auth_time),
            issued_at: timestamp(claims.iat),
            expires_at: timestamp(claims.exp),
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
            name: claims.name,
            picture: claims.picture,
            phone_number: claims.phone_number,
            sign_in_provider: firebase.sign_in_provider,
            tenant_id: firebase.tenant,
        }
    }
}

/// Convert epoch seconds into a UTC timestamp
///
/// Claims are compared as plain seconds, so values beyond what `DateTime`
/// can hold saturate to its bounds instead of failing.
pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(if secs < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
