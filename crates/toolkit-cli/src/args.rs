//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "toolkit")]
#[command(about = "Inspect cloud profiles and resolve their credentials")]
#[command(version)]
pub struct Cli {
    /// Path to the toolkit settings file
    #[arg(long, global = true, env = "TOOLKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every profile a credential source can serve
    Profiles,

    /// Resolve credentials for a profile
    Resolve {
        /// Profile identifier
        profile: String,

        /// Print the snapshot as JSON, secrets masked
        #[arg(long)]
        json: bool,
    },

    /// Print the effective settings
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_arguments() {
        let cli = Cli::try_parse_from(["toolkit", "resolve", "dev", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Resolve { profile, json } => {
                assert_eq!(profile, "dev");
                assert!(json);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["toolkit", "profiles", "--config", "/tmp/toolkit.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/toolkit.toml")));
        assert!(matches!(cli.command, Commands::Profiles));
    }

    #[test]
    fn test_resolve_requires_profile() {
        assert!(Cli::try_parse_from(["toolkit", "resolve"]).is_err());
    }
}
