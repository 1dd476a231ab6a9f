//! Error taxonomy for token verification
//!
//! Every failure in the pipeline is a distinct [`AuthError`] variant so callers
//! can branch on the kind (e.g. to choose a rejection response) instead of
//! parsing messages.

use chrono::{DateTime, Utc};
use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Time-bound claim that was found to lie in the future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeClaim {
    /// `iat`
    IssuedAt,
    /// `auth_time`
    AuthTime,
}

impl fmt::Display for TimeClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssuedAt => write!(f, "iat"),
            Self::AuthTime => write!(f, "auth_time"),
        }
    }
}

/// Token verification errors
///
/// `Clone` is required because the result of a single coalesced key fetch is
/// handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was presented
    #[error("no bearer token provided")]
    TokenMissing,

    /// The presented header is not a usable bearer credential
    #[error("invalid bearer credential: {0}")]
    TokenInvalid(String),

    /// The token is not structurally a well-formed ID token
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The header algorithm does not match the verification mode
    #[error("unexpected token algorithm {actual:?}, expected {expected:?}")]
    AlgorithmMismatch {
        /// Algorithm required by the current mode
        expected: String,
        /// Algorithm declared in the token header
        actual: String,
    },

    /// The issuer does not publish a key with this id
    #[error("no public key published for kid {0:?}")]
    KeyNotFound(String),

    /// The issuer's key set could not be retrieved
    #[error("failed to fetch signing keys: {0}")]
    KeyFetchFailed(String),

    /// The signature does not match the signed bytes
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// `exp` lies in the past
    #[error("token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    /// `iat` or `auth_time` lies in the future
    #[error("token is not yet valid ({0} is in the future)")]
    TokenNotYetValid(TimeClaim),

    /// `aud` is not this project
    #[error("invalid audience: expected {expected:?}, got {actual:?}")]
    InvalidAudience {
        /// Configured audience
        expected: String,
        /// Audience found in the token
        actual: String,
    },

    /// `iss` is not this project's issuer
    #[error("invalid issuer: expected {expected:?}, got {actual:?}")]
    InvalidIssuer {
        /// Configured issuer
        expected: String,
        /// Issuer found in the token
        actual: String,
    },

    /// `sub` is empty
    #[error("token has an empty subject")]
    SubjectMissing,

    /// The verifier was constructed with unusable settings
    #[error("invalid verifier configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// HTTP status a request layer should answer with for this error
    ///
    /// Key retrieval failures are the issuer's (or the network's) fault, so they
    /// map to `503`; configuration problems are ours and map to `500`; every
    /// other kind rejects the credential with `401`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyFetchFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether retrying the same token later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeyFetchFailed(_))
    }

    /// Stable short name of the error kind, suitable for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TokenMissing => "token_missing",
            Self::TokenInvalid(_) => "token_invalid",
            Self::MalformedToken(_) => "malformed_token",
            Self::AlgorithmMismatch { .. } => "algorithm_mismatch",
            Self::KeyNotFound(_) => "key_not_found",
            Self::KeyFetchFailed(_) => "key_fetch_failed",
            Self::SignatureInvalid => "signature_invalid",
            Self::TokenExpired(_) => "token_expired",
            Self::TokenNotYetValid(_) => "token_not_yet_valid",
            Self::InvalidAudience { .. } => "invalid_audience",
            Self::InvalidIssuer { .. } => "invalid_issuer",
            Self::SubjectMissing => "subject_missing",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Result alias used throughout the crate
pub type AuthResult<T> = Result<T, AuthError>;
