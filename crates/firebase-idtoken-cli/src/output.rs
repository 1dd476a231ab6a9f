//! Output formatting for CLI results

use firebase_idtoken::{AuthError, KeySet, VerifiedToken};
use serde_json::json;

use crate::cli::OutputFormat;
use crate::commands::Report;
use crate::error::CliResult;

/// Render a command report
///
/// # Output Formats
/// - JSON: pretty-printed object with a `valid` flag for verifications
/// - Human: short aligned summary
///
/// # Errors
///
/// Returns [`crate::error::CliError::Json`] if JSON serialization fails.
pub fn render(report: &Report, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report_json(report)?)?),
        OutputFormat::Human => Ok(report_human(report)),
    }
}

fn report_json(report: &Report) -> CliResult<serde_json::Value> {
    Ok(match report {
        Report::Verified(token) => json!({
            "valid": true,
            "token": serde_json::to_value(token)?,
        }),
        Report::Rejected(error) => json!({
            "valid": false,
            "kind": error.kind(),
            "error": error.to_string(),
        }),
        Report::Keys { url, set } => json!({
            "keys_url": url,
            "key_ids": set.key_ids(),
            "fetched_at": set.fetched_at().to_rfc3339(),
            "fresh_until": set.fresh_until().to_rfc3339(),
        }),
    })
}

fn report_human(report: &Report) -> String {
    match report {
        Report::Verified(token) => verified_human(token),
        Report::Rejected(error) => rejected_human(error),
        Report::Keys { url, set } => keys_human(url, set),
    }
}

fn verified_human(token: &VerifiedToken) -> String {
    let mut lines = vec!["valid ID token".to_string(), format!("  uid:        {}", token.uid)];
    if let Some(email) = &token.email {
        let verified = if token.email_verified { "verified" } else { "unverified" };
        lines.push(format!("  email:      {email} ({verified})"));
    }
    let optional = [
        ("name", &token.name),
        ("phone", &token.phone_number),
        ("picture", &token.picture),
        ("provider", &token.sign_in_provider),
        ("tenant", &token.tenant_id),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            lines.push(format!("  {:<11} {value}", format!("{label}:")));
        }
    }
    lines.push(format!("  auth time:  {}", token.auth_time.to_rfc3339()));
    lines.push(format!("  issued at:  {}", token.issued_at.to_rfc3339()));
    lines.push(format!("  expires at: {}", token.expires_at.to_rfc3339()));
    lines.join("\n")
}

fn rejected_human(error: &AuthError) -> String {
    format!("rejected ({}): {error}", error.kind())
}

fn keys_human(url: &str, set: &KeySet) -> String {
    let mut lines = vec![
        format!("{} keys from {url}", set.len()),
        format!("  fetched at:  {}", set.fetched_at().to_rfc3339()),
        format!("  fresh until: {}", set.fresh_until().to_rfc3339()),
    ];
    lines.extend(set.key_ids().into_iter().map(|kid| format!("  - {kid}")));
    lines.join("\n")
}
