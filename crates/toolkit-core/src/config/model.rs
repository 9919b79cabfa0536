//! Toolkit settings model

use crate::credentials::profile::ProfileFiles;
use crate::credentials::snapshot::DEFAULT_EXPIRY_BUFFER;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root settings object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub profiles: ProfilesConfig,
    pub credentials: CredentialsConfig,
    pub cache: CacheConfig,
    pub events: EventsConfig,
    /// Region for role calls when a profile names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
}

impl ToolkitConfig {
    /// Copy with every secret masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for keys in copy.credentials.static_profiles.values_mut() {
            keys.secret_access_key = "[REDACTED]".to_string();
            if keys.session_token.is_some() {
                keys.session_token = Some("[REDACTED]".to_string());
            }
        }
        copy
    }
}

/// Shared profile file locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Reload profiles when the files change
    pub watch: bool,
    #[serde(with = "humantime_serde")]
    pub watch_debounce: Duration,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            credentials_file: None,
            config_file: None,
            watch: true,
            watch_debounce: Duration::from_millis(500),
        }
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

impl ProfilesConfig {
    /// Effective file locations, `~` expanded
    pub fn files(&self) -> ProfileFiles {
        let defaults = ProfileFiles::default_locations();
        ProfileFiles {
            credentials: self
                .credentials_file
                .as_deref()
                .map(expand)
                .unwrap_or(defaults.credentials),
            config: self
                .config_file
                .as_deref()
                .map(expand)
                .unwrap_or(defaults.config),
        }
    }
}

/// Keys configured directly for a profile identifier
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticKeysConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl fmt::Debug for StaticKeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeysConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Which credential sources are active and how they behave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub static_profiles: HashMap<String, StaticKeysConfig>,
    pub enable_environment: bool,
    pub enable_system_properties: bool,
    /// Treat snapshots as expired this long before their expiry
    #[serde(with = "humantime_serde")]
    pub expiry_buffer: Duration,
    pub role_session_prefix: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            static_profiles: HashMap::new(),
            enable_environment: true,
            enable_system_properties: true,
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            role_session_prefix: "toolkit".to_string(),
        }
    }
}

/// Resource cache tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}
