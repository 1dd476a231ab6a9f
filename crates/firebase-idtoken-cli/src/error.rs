//! CLI error types

use firebase_idtoken::{AuthError, FetchError};
use thiserror::Error;

/// Errors that stop a command before it produces a report
///
/// A token that fails verification is not an error here; it is reported as a
/// rejection and only changes the exit code.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid or missing arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Verifier setup or key retrieval failed
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// HTTP client could not be created
    #[error("Key fetcher error: {0}")]
    Fetch(#[from] FetchError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidArguments(_) => vec![
                "Pass --project-id or set FIREBASE_PROJECT_ID",
                "Use --help to see expected arguments",
            ],
            Self::Auth(AuthError::KeyFetchFailed(_)) => vec![
                "Check network access to the key endpoint",
                "Increase the timeout with --timeout",
            ],
            Self::Auth(AuthError::InvalidConfig(_)) => {
                vec!["Check the project id and --keys-url values"]
            }
            Self::Config(_) => vec!["Check the --config file syntax and field names"],
            _ => vec![],
        }
    }
}

/// Result alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;
