//! Tower Service implementation for ID token verification

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use tower_service::Service;
use tracing::debug;

use crate::IdTokenVerifier;
use crate::error::AuthError;

use super::IdTokenLayerConfig;

/// Future type for [`IdTokenService`] responses
pub type IdTokenServiceFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Tower Service that verifies the bearer ID token before forwarding
#[derive(Debug, Clone)]
pub struct IdTokenService<S> {
    inner: S,
    verifier: Arc<IdTokenVerifier>,
    config: IdTokenLayerConfig,
}

impl<S> IdTokenService<S> {
    /// Create a new service
    pub fn new(inner: S, verifier: Arc<IdTokenVerifier>, config: IdTokenLayerConfig) -> Self {
        Self {
            inner,
            verifier,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Build the rejection response for a verification failure
fn rejection<B: Default>(error: &AuthError) -> http::Response<B> {
    let mut response = http::Response::new(B::default());
    let status = error.status_code();
    *response.status_mut() = status;
    if status == StatusCode::UNAUTHORIZED {
        let challenge = match error {
            AuthError::TokenMissing => HeaderValue::from_static("Bearer"),
            _ => HeaderValue::from_static("Bearer error=\"invalid_token\""),
        };
        response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
    }
    response
}

impl<S, B, ResBody> Service<http::Request<B>> for IdTokenService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = IdTokenServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let header = req
            .headers()
            .get(&self.config.auth_header)
            .map(|value| value.to_str().map(str::to_owned));
        let verifier = Arc::clone(&self.verifier);
        let allow_anonymous = self.config.allow_anonymous;

        Box::pin(async move {
            let outcome = match header {
                None => Err(AuthError::TokenMissing),
                Some(Err(_)) => Err(AuthError::TokenInvalid(
                    "authorization header is not valid UTF-8".to_string(),
                )),
                Some(Ok(value)) => verifier.verify_from_header(&value).await,
            };

            match outcome {
                Ok(verified) => {
                    req.extensions_mut().insert(verified);
                    inner.call(req).await
                }
                Err(e) if allow_anonymous => {
                    debug!(kind = e.kind(), "Forwarding unauthenticated request");
                    inner.call(req).await
                }
                Err(e) => {
                    debug!(kind = e.kind(), error = %e, "Rejecting request");
                    Ok(rejection(&e))
                }
            }
        })
    }
}
