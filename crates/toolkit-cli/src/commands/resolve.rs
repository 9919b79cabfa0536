//! `toolkit resolve <profile>`

use crate::console::CliConsole;
use anyhow::Context;
use colored::*;
use serde_json::json;
use toolkit_core::{CredentialProvider, CredentialSnapshot, ToolkitContext};

/// Expiry and remaining lifetime, or "never"
fn format_expiry(snapshot: &CredentialSnapshot) -> String {
    match (snapshot.expires_at(), snapshot.remaining_lifetime()) {
        (Some(at), Some(left)) => format!("{} ({} min left)", at.to_rfc3339(), left.num_minutes()),
        (Some(at), None) => at.to_rfc3339(),
        _ => "never".to_string(),
    }
}

fn masked_json(snapshot: &CredentialSnapshot) -> serde_json::Value {
    json!({
        "access_key_id": snapshot.masked_access_key(),
        "session_token": snapshot.session_token().is_some(),
        "expires_at": snapshot.expires_at(),
        "source": snapshot.source().description(),
    })
}

pub async fn run(
    context: &ToolkitContext,
    console: &CliConsole,
    profile: &str,
    as_json: bool,
) -> anyhow::Result<()> {
    let provider = context.registry().resolve(profile)?;
    console.info(&format!("Using {}", provider.display_name()));

    let snapshot = provider
        .resolve()
        .await
        .with_context(|| format!("Failed to resolve credentials for '{}'", profile))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&masked_json(&snapshot))?);
        return Ok(());
    }

    console.print_header(&format!("Credentials for {}", profile.bold()));
    console.field("Access key", &snapshot.masked_access_key());
    console.field("Secret key", "********");
    console.field(
        "Session token",
        if snapshot.session_token().is_some() { "present" } else { "none" },
    );
    console.field("Expires", &format_expiry(&snapshot));
    console.field("Source", &snapshot.source().description());
    console.success("Credentials resolved");
    Ok(())
}
