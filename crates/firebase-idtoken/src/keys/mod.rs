//! Issuer signing-key retrieval and caching
//!
//! The [`KeyCache`] is the only component that talks to the network and the
//! only one holding mutable shared state:
//!
//! - **Lock-free reads**: the current [`KeySet`] lives in an `ArcSwapOption`;
//!   readers never block each other or a refresh.
//! - **Whole-set replacement**: a refresh builds a new [`KeySet`] and swaps it
//!   in atomically, so nobody observes a half-populated map.
//! - **Single flight**: concurrent misses join one shared fetch instead of
//!   each calling the endpoint.
//! - **Detached fetches**: the fetch runs on its own task, so a caller that
//!   gives up does not cancel it for everyone else.
//! - **No poisoning**: a failed fetch leaves the previous state untouched and
//!   the next miss starts a new attempt.

pub mod fetcher;
pub mod parse;

pub use fetcher::{FetchError, FetchResponse, KeyFetcher, ReqwestFetcher};
pub use parse::{parse_key_set, parse_max_age};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jsonwebtoken::DecodingKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::VerifierConfig;
use crate::error::{AuthError, AuthResult};

/// A public key published by the issuer
pub struct SigningKey {
    id: String,
    key: DecodingKey,
}

impl SigningKey {
    /// Wrap a decoding key under its published id
    pub fn new(id: impl Into<String>, key: DecodingKey) -> Self {
        Self { id: id.into(), key }
    }

    /// Published key id (`kid`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key material for signature verification
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One fetched key set and its freshness window
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: DateTime<Utc>,
    fresh_until: DateTime<Utc>,
}

impl KeySet {
    /// Build a key set; `fresh_until` is clamped to be no earlier than `fetched_at`
    pub fn new(
        keys: HashMap<String, Arc<SigningKey>>,
        fetched_at: DateTime<Utc>,
        fresh_until: DateTime<Utc>,
    ) -> Self {
        Self {
            keys,
            fetched_at,
            fresh_until: fresh_until.max(fetched_at),
        }
    }

    /// Whether the set may still be served at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.fresh_until
    }

    /// Look up a key by id
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    /// Sorted key ids in this set
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn fresh_until(&self) -> DateTime<Utc> {
        self.fresh_until
    }
}

type SharedFetch = Shared<BoxFuture<'static, AuthResult<Arc<KeySet>>>>;

struct KeyCacheInner {
    config: Arc<VerifierConfig>,
    fetcher: Arc<dyn KeyFetcher>,
    clock: Arc<dyn Clock>,
    current: ArcSwapOption<KeySet>,
    in_flight: Mutex<Option<SharedFetch>>,
}

/// Clears the in-flight slot when the fetch task ends, however it ends
struct InFlightGuard(Arc<KeyCacheInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *self.0.in_flight.lock() = None;
    }
}

/// Cache of the issuer's public signing keys
///
/// Cloning is cheap and clones share the same cache.
///
/// # Example
///
/// ```rust,no_run
/// # use firebase_idtoken::{VerifierConfig, clock::SystemClock, keys::{KeyCache, ReqwestFetcher}};
/// # use std::sync::Arc;
/// # tokio_test::block_on(async {
/// let cache = KeyCache::new(
///     Arc::new(VerifierConfig::new("my-project")),
///     Arc::new(ReqwestFetcher::new()?),
///     Arc::new(SystemClock),
/// );
///
/// let key = cache.resolve_key("a1b2c3").await?;
/// println!("resolved {}", key.id());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<KeyCacheInner>,
}

impl fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("keys_url", &self.inner.config.keys_url)
            .field("fetcher", &self.inner.fetcher)
            .field(
                "cached_keys",
                &self.inner.current.load().as_ref().map(|set| set.len()),
            )
            .field("fetch_in_flight", &self.inner.in_flight.lock().is_some())
            .finish()
    }
}

impl KeyCache {
    /// Create an empty cache
    pub fn new(
        config: Arc<VerifierConfig>,
        fetcher: Arc<dyn KeyFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(KeyCacheInner {
                config,
                fetcher,
                clock,
                current: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Resolve the key named by a token header
    ///
    /// Served from memory while the cached set is fresh. A miss, an expired
    /// set, or an id absent from a fresh set (keys can be published before
    /// they expire elsewhere) triggers a refetch, except that unknown ids do
    /// not refetch more often than `min_refresh_interval`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyNotFound`] if the issuer does not publish `kid`
    /// - [`AuthError::KeyFetchFailed`] if the key set could not be retrieved
    pub async fn resolve_key(&self, kid: &str) -> AuthResult<Arc<SigningKey>> {
        let now = self.inner.clock.now();
        let seen = self.inner.current.load_full();

        if let Some(set) = &seen
            && set.is_fresh(now)
        {
            if let Some(key) = set.get(kid) {
                debug!(kid = %kid, "Using cached signing key");
                return Ok(key);
            }
            if !self.inner.unknown_kid_refresh_allowed(set, now) {
                warn!(kid = %kid, "Unknown kid, refresh rate limited");
                return Err(AuthError::KeyNotFound(kid.to_string()));
            }
        }

        let set = self
            .shared_fetch(|inner| inner.replacement_for(seen.as_ref()))
            .await?;
        set.get(kid).ok_or_else(|| {
            warn!(kid = %kid, key_count = set.len(), "Kid not in freshly fetched key set");
            AuthError::KeyNotFound(kid.to_string())
        })
    }

    /// Fetch the key set now, joining a fetch already in progress
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyFetchFailed`] on network errors, timeouts,
    /// non-success statuses or unparsable bodies.
    pub async fn refresh(&self) -> AuthResult<Arc<KeySet>> {
        self.shared_fetch(|_| None).await
    }

    /// Join the in-flight fetch or start one
    ///
    /// With no fetch in flight, `reuse` is asked under the slot lock for a set
    /// that makes fetching unnecessary.
    async fn shared_fetch<F>(&self, reuse: F) -> AuthResult<Arc<KeySet>>
    where
        F: FnOnce(&KeyCacheInner) -> Option<Arc<KeySet>>,
    {
        let fetch = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(fetch) => {
                    debug!("Joining in-flight key fetch");
                    fetch.clone()
                }
                None => {
                    if let Some(set) = reuse(&self.inner) {
                        debug!("Key set replaced by a concurrent fetch");
                        return Ok(set);
                    }
                    let guard = InFlightGuard(Arc::clone(&self.inner));
                    let task = tokio::spawn(async move {
                        let guard = guard;
                        guard.0.fetch_and_install().await
                    });
                    let fetch = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(AuthError::KeyFetchFailed(format!("key fetch task failed: {e}")))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// The cached key set, fresh or not
    pub fn cached(&self) -> Option<Arc<KeySet>> {
        self.inner.current.load_full()
    }

    /// Ids of the cached keys (empty when nothing is cached)
    pub fn current_key_ids(&self) -> Vec<String> {
        self.cached().map(|set| set.key_ids()).unwrap_or_default()
    }

    /// Drop the cached key set
    pub fn clear(&self) {
        self.inner.current.store(None);
        debug!(keys_url = %self.inner.config.keys_url, "Key cache cleared");
    }
}

impl KeyCacheInner {
    /// The current set, if it is fresh and was installed after `seen` was loaded
    fn replacement_for(&self, seen: Option<&Arc<KeySet>>) -> Option<Arc<KeySet>> {
        let current = self.current.load_full()?;
        let replaced = seen.is_none_or(|seen| !Arc::ptr_eq(seen, &current));
        (replaced && current.is_fresh(self.clock.now())).then_some(current)
    }

    fn unknown_kid_refresh_allowed(&self, set: &KeySet, now: DateTime<Utc>) -> bool {
        let interval = TimeDelta::from_std(self.config.min_refresh_interval).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(set.fetched_at()) >= interval
    }

    async fn fetch_and_install(&self) -> AuthResult<Arc<KeySet>> {
        let url = self.config.keys_url.as_str();
        let timeout = self.config.fetch_timeout;

        info!(url = %url, "Fetching signing keys");

        let response = match tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(url = %url, error = %e, "Failed to fetch signing keys");
                return Err(AuthError::KeyFetchFailed(e.to_string()));
            }
            Err(_) => {
                error!(url = %url, timeout_ms = timeout.as_millis(), "Signing key fetch timed out");
                return Err(AuthError::KeyFetchFailed(format!(
                    "request timed out after {timeout:?}"
                )));
            }
        };

        if !response.is_success() {
            error!(url = %url, status = response.status, "Key endpoint returned error status");
            return Err(AuthError::KeyFetchFailed(format!(
                "key endpoint returned status {}",
                response.status
            )));
        }

        let keys = parse_key_set(&response.body, self.config.key_set_format).inspect_err(|e| {
            error!(url = %url, error = %e, "Failed to parse signing keys");
        })?;

        let ttl = response
            .cache_control
            .as_deref()
            .and_then(parse_max_age)
            .unwrap_or(self.config.default_key_ttl)
            .min(parse::MAX_KEY_TTL);
        let fetched_at = self.clock.now();
        let fresh_until = fetched_at
            .checked_add_signed(TimeDelta::from_std(ttl).unwrap_or_default())
            .unwrap_or(fetched_at);

        let set = Arc::new(KeySet::new(keys, fetched_at, fresh_until));
        self.current.store(Some(Arc::clone(&set)));

        info!(
            url = %url,
            key_count = set.len(),
            ttl_secs = ttl.as_secs(),
            "Fetched signing keys"
        );

        Ok(set)
    }
}
