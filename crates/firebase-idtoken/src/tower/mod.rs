//! # Tower Middleware Integration
//!
//! [`IdTokenLayer`] wraps an `http::Request<B>` service with ID token
//! verification:
//!
//! - reads the `Authorization` header (name configurable)
//! - verifies it with a shared [`IdTokenVerifier`](crate::IdTokenVerifier)
//! - on success inserts the [`VerifiedToken`](crate::VerifiedToken) into the
//!   request extensions and forwards the request
//! - on failure answers `401` (or `503` when keys could not be fetched) with a
//!   `WWW-Authenticate` challenge, without calling the inner service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use firebase_idtoken::tower::IdTokenLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(IdTokenLayer::new(verifier))
//!     .service(my_inner_service);
//!
//! // In the inner service
//! if let Some(user) = req.extensions().get::<VerifiedToken>() {
//!     println!("Authenticated user: {}", user.uid);
//! }
//! ```

mod layer;
mod service;

pub use layer::IdTokenLayer;
pub use service::{IdTokenService, IdTokenServiceFuture};

/// Configuration for the ID token layer
#[derive(Debug, Clone)]
pub struct IdTokenLayerConfig {
    /// Let requests without a valid token through (without a `VerifiedToken`)
    pub allow_anonymous: bool,
    /// Request paths that skip verification entirely (e.g. `/healthz`)
    pub bypass_paths: Vec<String>,
    /// Header carrying the bearer credential
    pub auth_header: http::HeaderName,
}

impl Default for IdTokenLayerConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: false,
            bypass_paths: Vec::new(),
            auth_header: http::header::AUTHORIZATION,
        }
    }
}

impl IdTokenLayerConfig {
    /// Create a config that allows anonymous access
    #[must_use]
    pub fn allow_anonymous() -> Self {
        Self {
            allow_anonymous: true,
            ..Default::default()
        }
    }

    /// Add a path that bypasses verification
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.bypass_paths.push(path.into());
        self
    }

    /// Read the credential from a different header
    #[must_use]
    pub fn auth_header(mut self, header: http::HeaderName) -> Self {
        self.auth_header = header;
        self
    }

    /// Check if a request path should bypass verification
    #[must_use]
    pub fn should_bypass(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }
}
