//! Subcommand implementations

pub mod config;
pub mod profiles;
pub mod resolve;
