//! `toolkit config`

use crate::console::CliConsole;
use toolkit_core::ToolkitConfig;

/// Print the effective settings with secrets masked
pub fn show(config: &ToolkitConfig, console: &CliConsole) -> anyhow::Result<()> {
    console.print_header("Configuration");

    let files = config.profiles.files();
    console.field("Credentials", &files.credentials.display().to_string());
    console.field("Config", &files.config.display().to_string());
    println!();
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}
