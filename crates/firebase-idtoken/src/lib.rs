//! # firebase-idtoken - Firebase ID Token Verification
//!
//! Verifies Firebase Authentication ID tokens (RS256 JWTs issued by
//! `https://securetoken.google.com/<project-id>`) and turns them into a
//! [`VerifiedToken`] describing the authenticated user.
//!
//! ## Design Principles
//!
//! - **All or nothing**: a [`VerifiedToken`] is only produced when decoding,
//!   algorithm, key, signature and every claim check have passed
//! - **Shared key cache**: issuer keys are fetched once, cached for the
//!   endpoint's `max-age`, and refreshed by a single request no matter how
//!   many verifications are waiting
//! - **Injectable edges**: key transport ([`KeyFetcher`]) and time source
//!   ([`Clock`]) are traits, so tests run without network or wall clock
//!
//! ## Architecture
//!
//! - [`decode`](mod@decode) - Split and decode the three token segments
//! - [`keys`] - Signing-key fetching, parsing and caching
//! - [`verifier`] - The verification pipeline
//! - [`config`] - Verifier configuration and environment loading
//! - [`claims`] - Header, claim and result types
//! - [`bearer`] - `Authorization: Bearer` extraction
//! - [`clock`] - Injectable time source
//! - [`error`] - Error taxonomy
//! - `tower` - Tower middleware (feature `middleware`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use firebase_idtoken::{IdTokenVerifier, VerifierConfig};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = VerifierConfig::new("my-project").with_clock_skew(Duration::from_secs(5));
//! let verifier = IdTokenVerifier::new(config)?;
//!
//! let user = verifier.verify("eyJhbGciOiJSUzI1NiIsImtpZCI6...").await?;
//! println!("uid={} email={:?}", user.uid, user.email);
//! # Ok::<(), firebase_idtoken::AuthError>(())
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (alias `tower`) - `tower` layer that verifies the
//!   `Authorization` header and stores the [`VerifiedToken`] in request extensions
//!
//! ## Emulator
//!
//! With `FIREBASE_AUTH_EMULATOR_HOST` set (or
//! [`VerifierConfig::with_emulator_mode`]) tokens must be unsigned (`alg: none`)
//! and no keys are fetched. Never enable this in production.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bearer;
pub mod claims;
pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod keys;
pub mod verifier;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

// Re-export the verification surface
#[doc(inline)]
pub use verifier::IdTokenVerifier;

#[doc(inline)]
pub use config::{KeySetFormat, VerifierConfig};

#[doc(inline)]
pub use claims::{FirebaseInfo, Header, IdTokenClaims, VerifiedToken};

#[doc(inline)]
pub use error::{AuthError, AuthResult, TimeClaim};

// Re-export key cache types
#[doc(inline)]
pub use keys::{FetchError, FetchResponse, KeyCache, KeyFetcher, KeySet, ReqwestFetcher, SigningKey};

#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};

pub use bearer::extract_bearer;
pub use decode::{DecodedToken, decode};
