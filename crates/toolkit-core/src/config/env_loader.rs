//! Environment variable overrides

use super::model::ToolkitConfig;
use crate::credentials::profile::{CONFIG_FILE_VAR, CREDENTIALS_FILE_VAR};
use crate::error::{ToolkitError, ToolkitResult};
use humantime_serde::re::humantime;
use std::path::PathBuf;

pub const REGION_VAR: &str = "AWS_REGION";
pub const DEFAULT_REGION_VAR: &str = "AWS_DEFAULT_REGION";
pub const CACHE_TTL_VAR: &str = "TOOLKIT_CACHE_TTL";

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut ToolkitConfig) -> ToolkitResult<()> {
    apply_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`; blank values are ignored
pub fn apply_overrides_with<F>(config: &mut ToolkitConfig, lookup: F) -> ToolkitResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(path) = var(CREDENTIALS_FILE_VAR) {
        config.profiles.credentials_file = Some(PathBuf::from(path));
    }
    if let Some(path) = var(CONFIG_FILE_VAR) {
        config.profiles.config_file = Some(PathBuf::from(path));
    }

    if let Some(region) = var(REGION_VAR).or_else(|| var(DEFAULT_REGION_VAR)) {
        config.default_region = Some(region);
    }

    if let Some(raw) = var(CACHE_TTL_VAR) {
        config.cache.default_ttl = humantime::parse_duration(raw.trim()).map_err(|e| {
            ToolkitError::settings(
                Some("cache.default_ttl"),
                format!("{}='{}' is not a duration: {}", CACHE_TTL_VAR, raw, e),
            )
        })?;
    }

    Ok(())
}
