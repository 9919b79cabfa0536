//! Toolkit settings
//!
//! Settings come from an optional JSON/TOML/YAML file, then environment
//! overrides, then validation.

mod env_loader;
mod file_loader;
mod model;
mod validation;

pub use env_loader::{
    CACHE_TTL_VAR, DEFAULT_REGION_VAR, REGION_VAR, apply_env_overrides, apply_overrides_with,
};
pub use file_loader::{default_config_path, load_from_file};
pub use model::{
    CacheConfig, CredentialsConfig, EventsConfig, ProfilesConfig, StaticKeysConfig, ToolkitConfig,
};
pub use validation::validate;

use crate::error::ToolkitResult;
use std::path::Path;
use tracing::debug;

/// Load settings from `path` (or the default location), apply environment
/// overrides and validate
pub fn load_config(path: Option<&Path>) -> ToolkitResult<ToolkitConfig> {
    let default_path = default_config_path();
    let path = path.unwrap_or(&default_path);
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    debug!(path = %path.display(), "Loaded toolkit settings");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolkitError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"events": {"capacity": 0}}"#).unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(ToolkitError::Settings { .. })
        ));
    }

    #[test]
    fn test_profile_files_expand_tilde() {
        let mut config = ToolkitConfig::default();
        config.profiles.credentials_file = Some("~/custom/credentials".into());
        let files = config.profiles.files();
        assert!(!files.credentials.to_string_lossy().starts_with('~'));
        assert!(files.credentials.ends_with("custom/credentials"));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = ToolkitConfig::default();
        config.credentials.static_profiles.insert(
            "ci".to_string(),
            StaticKeysConfig {
                access_key_id: "AKIACI".to_string(),
                secret_access_key: "hunter2".to_string(),
                session_token: Some("token".to_string()),
            },
        );
        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("\"token\""));
        assert!(shown.contains("AKIACI"));
    }
}
