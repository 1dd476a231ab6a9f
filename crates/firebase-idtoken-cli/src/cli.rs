//! CLI argument parsing

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "firebase-idtoken",
    version,
    about = "Verify Firebase ID tokens and inspect the issuer's signing keys",
    long_about = "Verifies Firebase Authentication ID tokens the way a backend would:\n\
                  RS256 signature against Google's published keys, then expiry, issue time,\n\
                  audience, issuer and subject.\n\n\
                  Settings are layered: environment (FIREBASE_PROJECT_ID, GOOGLE_CLOUD_PROJECT,\n\
                  GCLOUD_PROJECT, FIREBASE_AUTH_EMULATOR_HOST, FIREBASE_IDTOKEN_CLOCK_SKEW_SECS,\n\
                  FIREBASE_IDTOKEN_FETCH_TIMEOUT_SECS), then the --config file, then flags.\n\n\
                  SECURITY WARNING:\n\
                  - --emulator accepts unsigned tokens; never use it against production tokens"
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true, env = "FIREBASE_IDTOKEN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify an ID token
    Verify(VerifyArgs),

    /// Fetch and list the issuer's signing keys
    Keys(KeysArgs),
}

/// Verifier settings accepted on the command line
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifierArgs {
    /// Firebase project id (expected audience)
    #[arg(long, short = 'p')]
    pub project_id: Option<String>,

    /// Accept unsigned Auth emulator tokens
    #[arg(long)]
    pub emulator: bool,

    /// Tolerated clock skew in seconds
    #[arg(long, value_name = "SECS")]
    pub clock_skew: Option<u64>,

    /// Key fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Key endpoint to fetch from
    #[arg(long, value_name = "URL")]
    pub keys_url: Option<String>,

    /// Fetch the JWK set instead of the X.509 certificate map
    #[arg(long)]
    pub jwk: bool,
}

/// Arguments of `verify`
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub verifier: VerifierArgs,

    /// Treat the input as a full `Authorization` header value (`Bearer ...`)
    #[arg(long)]
    pub header: bool,

    /// The token; read from stdin when omitted or `-`
    pub token: Option<String>,
}

/// Arguments of `keys`
#[derive(Args, Debug, Clone)]
pub struct KeysArgs {
    #[command(flatten)]
    pub verifier: VerifierArgs,
}

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "firebase-idtoken",
            "verify",
            "--project-id",
            "demo",
            "--clock-skew",
            "30",
            "--format",
            "json",
            "abc.def.ghi",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.verifier.project_id.as_deref(), Some("demo"));
        assert_eq!(args.verifier.clock_skew, Some(30));
        assert!(!args.verifier.emulator);
        assert!(!args.header);
        assert_eq!(args.token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_parse_keys() {
        let cli =
            Cli::try_parse_from(["firebase-idtoken", "-v", "keys", "--jwk", "--timeout", "3"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Human);
        let Commands::Keys(args) = cli.command else {
            panic!("expected keys");
        };
        assert!(args.verifier.jwk);
        assert_eq!(args.verifier.timeout, Some(3));
    }

    #[test]
    fn test_rejects_non_numeric_skew() {
        assert!(
            Cli::try_parse_from(["firebase-idtoken", "verify", "--clock-skew", "soon"]).is_err()
        );
    }
}
