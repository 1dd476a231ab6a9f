//! Command implementations

use firebase_idtoken::keys::KeyCache;
use firebase_idtoken::{AuthError, IdTokenVerifier, KeySet, ReqwestFetcher, SystemClock, VerifiedToken};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::cli::VerifyArgs;
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Outcome of a command, rendered by [`crate::output::render`]
#[derive(Debug)]
pub enum Report {
    /// The token verified
    Verified(VerifiedToken),
    /// The token was rejected
    Rejected(AuthError),
    /// A freshly fetched key set
    Keys { url: String, set: Arc<KeySet> },
}

impl Report {
    /// Whether the command achieved what was asked
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Verify a token from the arguments or from `input`
///
/// Verification failures become [`Report::Rejected`]; only problems that keep
/// the verifier from running at all are errors. A key endpoint that cannot
/// be reached is therefore a rejection too, matching what a server would
/// answer.
///
/// # Errors
///
/// - [`CliError::InvalidArguments`] without a project id or with empty input
/// - [`CliError::Auth`] for an invalid verifier configuration
/// - [`CliError::Io`] if stdin cannot be read
pub async fn verify<R>(args: &VerifyArgs, settings: &Settings, input: R) -> CliResult<Report>
where
    R: AsyncRead + Unpin,
{
    let verifier = IdTokenVerifier::new(settings.verifier_config()?)?;
    let raw = read_token(args.token.as_deref(), input).await?;

    debug!(
        project_id = %verifier.config().expected_audience,
        emulator = verifier.config().emulator_mode,
        header = args.header,
        "Verifying token"
    );

    let result = if args.header {
        verifier.verify_from_header(&raw).await
    } else {
        verifier.verify(&raw).await
    };

    Ok(match result {
        Ok(token) => Report::Verified(token),
        Err(error) => Report::Rejected(error),
    })
}

/// Fetch the key set once
///
/// # Errors
///
/// [`CliError::Fetch`] if the HTTP client cannot be built, [`CliError::Auth`]
/// for an invalid key source or a failed fetch.
pub async fn keys(settings: &Settings) -> CliResult<Report> {
    let config = settings.key_source_config()?;
    let url = config.keys_url.clone();
    let cache = KeyCache::new(
        Arc::new(config),
        Arc::new(ReqwestFetcher::new()?),
        Arc::new(SystemClock),
    );
    let set = cache.refresh().await?;
    Ok(Report::Keys { url, set })
}

async fn read_token<R>(arg: Option<&str>, mut input: R) -> CliResult<String>
where
    R: AsyncRead + Unpin,
{
    let raw = match arg {
        Some(token) if token != "-" => token.to_string(),
        _ => {
            let mut buf = String::new();
            input.read_to_string(&mut buf).await?;
            buf
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidArguments("no token given".to_string()));
    }
    Ok(trimmed.to_string())
}
