//! File-based settings loading

use super::model::ToolkitConfig;
use crate::error::{ToolkitError, ToolkitResult};
use std::fs;
use std::path::{Path, PathBuf};

/// `<config dir>/toolkit/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolkit")
        .join("config.toml")
}

/// Load settings from a file
///
/// JSON, TOML and YAML are chosen by extension (JSON otherwise). A missing
/// file yields the defaults.
pub fn load_from_file(path: &Path) -> ToolkitResult<ToolkitConfig> {
    if !path.exists() {
        return Ok(ToolkitConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ToolkitError::settings(None, format!("Failed to read {}: {}", path.display(), e))
    })?;

    let parsed: ToolkitResult<ToolkitConfig> = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(ToolkitError::from),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(ToolkitError::from),
        _ => serde_json::from_str(&content).map_err(ToolkitError::from),
    };

    parsed.map_err(|e| {
        ToolkitError::settings(None, format!("Failed to parse {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ToolkitConfig::default());
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
default_region = "eu-west-1"

[cache]
default_ttl = "10m"

[credentials]
enable_system_properties = false
expiry_buffer = "2m"

[credentials.static_profiles.ci]
access_key_id = "AKIACI"
secret_access_key = "cisecret"
"#,
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.default_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(60));
        assert!(!config.credentials.enable_system_properties);
        assert!(config.credentials.enable_environment);
        assert_eq!(config.credentials.expiry_buffer, Duration::from_secs(120));
        assert_eq!(config.credentials.static_profiles["ci"].access_key_id, "AKIACI");
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"events": {"capacity": 8}}"#).unwrap();
        assert_eq!(load_from_file(&json).unwrap().events.capacity, 8);

        let yaml = dir.path().join("config.yaml");
        fs::write(&yaml, "profiles:\n  credentials_file: ~/creds\n  watch: false\n").unwrap();
        let config = load_from_file(&yaml).unwrap();
        assert!(!config.profiles.watch);
        assert_eq!(config.profiles.credentials_file, Some(PathBuf::from("~/creds")));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\n").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, ToolkitError::Settings { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
