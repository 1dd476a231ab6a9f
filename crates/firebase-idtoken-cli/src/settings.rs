//! Layered verifier settings
//!
//! Sources, lowest precedence first: environment, config file, flags.

use firebase_idtoken::config::{
    CLOCK_SKEW_ENV_VAR, EMULATOR_HOST_ENV_VAR, FETCH_TIMEOUT_ENV_VAR, JWK_KEYS_URL,
    PROJECT_ID_ENV_VARS,
};
use firebase_idtoken::{KeySetFormat, VerifierConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::cli::VerifierArgs;
use crate::error::{CliError, CliResult};

/// Published key format, as spelled in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    X509,
    Jwk,
}

impl From<KeyFormat> for KeySetFormat {
    fn from(format: KeyFormat) -> Self {
        match format {
            KeyFormat::X509 => Self::X509Certificates,
            KeyFormat::Jwk => Self::JwkSet,
        }
    }
}

/// Partially specified verifier settings
///
/// Config file example (`firebase-idtoken.toml`):
///
/// ```toml
/// project_id = "my-project"
/// clock_skew_secs = 5
/// fetch_timeout_secs = 10
/// key_format = "jwk"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub project_id: Option<String>,
    pub emulator: Option<bool>,
    pub clock_skew_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub keys_url: Option<String>,
    pub key_format: Option<KeyFormat>,
}

impl Settings {
    /// Settings from environment variables
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArguments`] if a numeric variable does not parse.
    pub fn from_env_map(env: &HashMap<String, String>) -> CliResult<Self> {
        let project_id = PROJECT_ID_ENV_VARS
            .iter()
            .filter_map(|var| env.get(*var))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_owned);

        let emulator = env
            .get(EMULATOR_HOST_ENV_VAR)
            .filter(|host| !host.is_empty())
            .map(|_| true);

        Ok(Self {
            project_id,
            emulator,
            clock_skew_secs: env_secs(env, CLOCK_SKEW_ENV_VAR)?,
            fetch_timeout_secs: env_secs(env, FETCH_TIMEOUT_ENV_VAR)?,
            ..Self::default()
        })
    }

    /// Settings from a TOML, YAML or JSON file
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read or has unknown
    /// or mistyped fields.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Settings given as flags
    pub fn from_args(args: &VerifierArgs) -> Self {
        Self {
            project_id: args.project_id.clone(),
            emulator: args.emulator.then_some(true),
            clock_skew_secs: args.clock_skew,
            fetch_timeout_secs: args.timeout,
            keys_url: args.keys_url.clone(),
            key_format: args.jwk.then_some(KeyFormat::Jwk),
        }
    }

    /// Layer environment, optional file and flags
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env_map`] and [`Settings::from_file`].
    pub fn resolve(
        args: &VerifierArgs,
        file: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> CliResult<Self> {
        let mut settings = Self::from_env_map(env)?;
        if let Some(path) = file {
            settings = settings.overlay(Self::from_file(path)?);
        }
        Ok(settings.overlay(Self::from_args(args)))
    }

    /// Values set in `other` win
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            project_id: other.project_id.or(self.project_id),
            emulator: other.emulator.or(self.emulator),
            clock_skew_secs: other.clock_skew_secs.or(self.clock_skew_secs),
            fetch_timeout_secs: other.fetch_timeout_secs.or(self.fetch_timeout_secs),
            keys_url: other.keys_url.or(self.keys_url),
            key_format: other.key_format.or(self.key_format),
        }
    }

    /// Build a verifier configuration; a project id is required
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArguments`] without a project id and
    /// [`CliError::Auth`] if the resulting configuration is invalid.
    pub fn verifier_config(&self) -> CliResult<VerifierConfig> {
        let project_id = self.project_id.as_deref().ok_or_else(|| {
            CliError::InvalidArguments(format!(
                "no project id; pass --project-id or set one of {}",
                PROJECT_ID_ENV_VARS.join(", ")
            ))
        })?;
        let config = self.apply(VerifierConfig::new(project_id));
        config.validate()?;
        Ok(config)
    }

    /// Configuration for key retrieval only; the project id is not needed
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Auth`] for a zero timeout or a non-HTTP(S) keys URL.
    pub fn key_source_config(&self) -> CliResult<VerifierConfig> {
        let config = self.apply(VerifierConfig::new(self.project_id.clone().unwrap_or_default()));
        config.validate_key_source()?;
        Ok(config)
    }

    fn apply(&self, mut config: VerifierConfig) -> VerifierConfig {
        config = config.with_emulator_mode(self.emulator.unwrap_or(false));
        if let Some(secs) = self.clock_skew_secs {
            config = config.with_clock_skew(Duration::from_secs(secs));
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }
        if let Some(format) = self.key_format {
            config = config.with_key_set_format(format.into());
            if format == KeyFormat::Jwk {
                config = config.with_keys_url(JWK_KEYS_URL);
            }
        }
        if let Some(url) = &self.keys_url {
            config = config.with_keys_url(url.clone());
        }
        config
    }
}

fn env_secs(env: &HashMap<String, String>, var: &str) -> CliResult<Option<u64>> {
    env.get(var)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| CliError::InvalidArguments(format!("{var}={raw:?}: {e}")))
        })
        .transpose()
}
