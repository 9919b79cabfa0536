//! `toolkit profiles`

use crate::console::CliConsole;
use toolkit_core::ToolkitContext;

pub fn list(context: &ToolkitContext, console: &CliConsole) {
    console.print_header("Profiles");

    let sources = context.registry().factory_kinds();
    console.info(&format!("Credential sources: {}", sources.join(", ")));

    let profiles = context.registry().known_profiles();
    if profiles.is_empty() {
        console.warn("No profiles found");
        return;
    }
    for profile in profiles {
        println!("  {}", profile);
    }
}
