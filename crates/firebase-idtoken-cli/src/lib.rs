//! # firebase-idtoken CLI
//!
//! Command-line front end for the `firebase-idtoken` crate.
//!
//! ## Features
//!
//! - Verify an ID token (or a full `Bearer` header) against Google's keys
//! - Accept unsigned Auth emulator tokens with `--emulator`
//! - List the issuer's current signing keys and their freshness
//! - Layered settings: environment, config file, flags
//! - JSON and human-readable output formats
//!
//! ## Usage
//!
//! ```bash
//! # Verify a token passed as an argument
//! firebase-idtoken verify --project-id my-project eyJhbGciOiJSUzI1NiIs...
//!
//! # Verify a header value from stdin, JSON output
//! echo "Bearer eyJhbGciOi..." | firebase-idtoken verify --header -f json
//!
//! # Inspect the published keys
//! firebase-idtoken keys --jwk
//! ```
//!
//! Exit codes: `0` on success, `1` when the token is rejected, `2` on usage
//! or setup errors.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod settings;

use clap::Parser;
use std::collections::HashMap;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands, KeysArgs, OutputFormat, VerifierArgs, VerifyArgs};
pub use commands::Report;
pub use error::{CliError, CliResult};
pub use settings::Settings;

/// Run the CLI application against the process arguments and environment
///
/// # Errors
///
/// Returns a [`CliError`] for usage or setup problems; a rejected token is
/// reported on stdout and reflected in the exit code instead.
pub async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env: HashMap<String, String> = std::env::vars().collect();
    let format = cli.format;
    let report = execute(cli, &env).await?;

    println!("{}", output::render(&report, format)?);
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Resolve settings and run the selected command
///
/// # Errors
///
/// See [`commands::verify`], [`commands::keys`] and [`Settings::resolve`].
pub async fn execute(cli: Cli, env: &HashMap<String, String>) -> CliResult<Report> {
    match cli.command {
        Commands::Verify(args) => {
            let settings = Settings::resolve(&args.verifier, cli.config.as_deref(), env)?;
            commands::verify(&args, &settings, tokio::io::stdin()).await
        }
        Commands::Keys(args) => {
            let settings = Settings::resolve(&args.verifier, cli.config.as_deref(), env)?;
            commands::keys(&settings).await
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
