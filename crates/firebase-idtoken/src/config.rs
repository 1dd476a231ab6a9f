//! Verifier configuration
//!
//! A [`VerifierConfig`] is built once and shared read-only (behind an `Arc`)
//! by every concurrent verification.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// Issuer prefix; the full issuer is this prefix followed by the project id
pub const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Google's published ID-token signing certificates (`kid -> PEM certificate`)
pub const DEFAULT_KEYS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// The same keys published as a JSON Web Key Set
pub const JWK_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Algorithm the issuer signs production tokens with
pub const SIGNING_ALGORITHM: &str = "RS256";

/// Algorithm carried by unsigned emulator tokens
pub const EMULATOR_ALGORITHM: &str = "none";

/// Environment variables that name the project, in lookup order
pub const PROJECT_ID_ENV_VARS: &[&str] =
    &["FIREBASE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

/// Presence of this variable switches verification to emulator mode
pub const EMULATOR_HOST_ENV_VAR: &str = "FIREBASE_AUTH_EMULATOR_HOST";

/// Clock skew tolerance override, in seconds
pub const CLOCK_SKEW_ENV_VAR: &str = "FIREBASE_IDTOKEN_CLOCK_SKEW_SECS";

/// Key fetch timeout override, in seconds
pub const FETCH_TIMEOUT_ENV_VAR: &str = "FIREBASE_IDTOKEN_FETCH_TIMEOUT_SECS";

/// Shape of the key-publishing endpoint's response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySetFormat {
    /// JSON object mapping key ids to PEM certificates (or PEM public keys)
    #[default]
    X509Certificates,
    /// RFC 7517 JSON Web Key Set
    JwkSet,
}

/// Immutable validation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Required `aud` claim (the project id)
    pub expected_audience: String,
    /// Required `iss` claim
    pub expected_issuer: String,
    /// Leeway applied to `exp`, `iat` and `auth_time`
    pub clock_skew: Duration,
    /// Accept unsigned tokens from the Auth emulator instead of RS256 tokens
    pub emulator_mode: bool,
    /// Upper bound on a single key-set fetch
    pub fetch_timeout: Duration,
    /// Key-publishing endpoint
    pub keys_url: String,
    /// Response format of `keys_url`
    pub key_set_format: KeySetFormat,
    /// Freshness used when the endpoint sends no `max-age`
    pub default_key_ttl: Duration,
    /// Minimum spacing of refetches triggered by an unknown `kid` while the
    /// cached set is still fresh
    pub min_refresh_interval: Duration,
}

impl VerifierConfig {
    /// Create a configuration for a project with default settings
    ///
    /// # Default Settings
    ///
    /// - Clock skew: none
    /// - Emulator mode: off
    /// - Fetch timeout: 10 seconds
    /// - Key TTL fallback: 1 hour
    /// - Minimum unknown-kid refresh interval: 5 seconds
    ///
    /// # Example
    ///
    /// ```rust
    /// use firebase_idtoken::VerifierConfig;
    ///
    /// let config = VerifierConfig::new("my-project");
    /// assert_eq!(config.expected_audience, "my-project");
    /// assert_eq!(config.expected_issuer, "https://securetoken.google.com/my-project");
    /// ```
    pub fn new(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        Self {
            expected_issuer: format!("{ISSUER_PREFIX}{project_id}"),
            expected_audience: project_id,
            clock_skew: Duration::ZERO,
            emulator_mode: false,
            fetch_timeout: Duration::from_secs(10),
            keys_url: DEFAULT_KEYS_URL.to_string(),
            key_set_format: KeySetFormat::X509Certificates,
            default_key_ttl: Duration::from_secs(3600),
            min_refresh_interval: Duration::from_secs(5),
        }
    }

    /// Build a configuration from an explicit environment map
    ///
    /// This is a pure function of `env`; [`VerifierConfig::from_env`] feeds it
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if no project id variable is set or
    /// a numeric override does not parse.
    pub fn from_env_map(env: &HashMap<String, String>) -> AuthResult<Self> {
        let project_id = PROJECT_ID_ENV_VARS
            .iter()
            .filter_map(|var| env.get(*var))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .ok_or_else(|| {
                AuthError::InvalidConfig(format!(
                    "no project id found in {}",
                    PROJECT_ID_ENV_VARS.join(", ")
                ))
            })?;

        let mut config = Self::new(project_id)
            .with_emulator_mode(env.get(EMULATOR_HOST_ENV_VAR).is_some_and(|h| !h.is_empty()));

        if let Some(secs) = parse_secs(env, CLOCK_SKEW_ENV_VAR)? {
            config = config.with_clock_skew(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_secs(env, FETCH_TIMEOUT_ENV_VAR)? {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the process environment
    ///
    /// # Errors
    ///
    /// See [`VerifierConfig::from_env_map`].
    pub fn from_env() -> AuthResult<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    /// Set clock skew tolerance
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Enable or disable emulator mode
    pub fn with_emulator_mode(mut self, enabled: bool) -> Self {
        self.emulator_mode = enabled;
        self
    }

    /// Set the key fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Point the key cache at a different endpoint
    pub fn with_keys_url(mut self, url: impl Into<String>) -> Self {
        self.keys_url = url.into();
        self
    }

    /// Set the endpoint's response format
    pub fn with_key_set_format(mut self, format: KeySetFormat) -> Self {
        self.key_set_format = format;
        self
    }

    /// Set the freshness used when the endpoint omits `max-age`
    pub fn with_default_key_ttl(mut self, ttl: Duration) -> Self {
        self.default_key_ttl = ttl;
        self
    }

    /// Set the minimum spacing of unknown-kid refetches (zero disables)
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] for an empty audience or issuer, a
    /// zero fetch timeout, or a non-HTTP(S) keys URL.
    pub fn validate(&self) -> AuthResult<()> {
        if self.expected_audience.trim().is_empty() {
            return Err(AuthError::InvalidConfig("project id must not be empty".into()));
        }
        if self.expected_issuer.trim().is_empty() {
            return Err(AuthError::InvalidConfig("issuer must not be empty".into()));
        }
        self.validate_key_source()
    }

    /// Check only the settings used to retrieve keys
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] for a zero fetch timeout or a
    /// non-HTTP(S) keys URL.
    pub fn validate_key_source(&self) -> AuthResult<()> {
        if self.fetch_timeout.is_zero() {
            return Err(AuthError::InvalidConfig("fetch timeout must be non-zero".into()));
        }
        if !self.keys_url.starts_with("https://") && !self.keys_url.starts_with("http://") {
            return Err(AuthError::InvalidConfig(format!(
                "keys url must be http(s): {}",
                self.keys_url
            )));
        }
        Ok(())
    }

    /// Algorithm a token must declare under the current mode
    pub fn required_algorithm(&self) -> &'static str {
        if self.emulator_mode {
            EMULATOR_ALGORITHM
        } else {
            SIGNING_ALGORITHM
        }
    }
}

fn parse_secs(env: &HashMap<String, String>, var: &str) -> AuthResult<Option<u64>> {
    env.get(var)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| AuthError::InvalidConfig(format!("{var}={raw:?}: {e}")))
        })
        .transpose()
}
