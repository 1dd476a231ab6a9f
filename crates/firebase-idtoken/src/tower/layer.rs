//! Tower Layer implementation for ID token verification

use std::sync::Arc;
use tower::Layer;

use crate::IdTokenVerifier;

use super::IdTokenLayerConfig;
use super::service::IdTokenService;

/// Tower Layer that adds ID token verification to services
#[derive(Debug, Clone)]
pub struct IdTokenLayer {
    verifier: Arc<IdTokenVerifier>,
    config: IdTokenLayerConfig,
}

impl IdTokenLayer {
    /// Create a new layer with default configuration
    pub fn new(verifier: IdTokenVerifier) -> Self {
        Self::from_arc(Arc::new(verifier))
    }

    /// Create a new layer sharing an existing verifier (and its key cache)
    pub fn from_arc(verifier: Arc<IdTokenVerifier>) -> Self {
        Self {
            verifier,
            config: IdTokenLayerConfig::default(),
        }
    }

    /// Set the configuration for this layer
    #[must_use]
    pub fn config(mut self, config: IdTokenLayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow anonymous requests to pass through
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.config.allow_anonymous = true;
        self
    }

    /// Add a path that bypasses verification
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }
}

impl<S> Layer<S> for IdTokenLayer {
    type Service = IdTokenService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdTokenService::new(inner, Arc::clone(&self.verifier), self.config.clone())
    }
}
