//! Explicit keys configured in toolkit settings

use super::provider::{CredentialProvider, CredentialSourceFactory, SharedCredentialProvider};
use super::snapshot::CredentialSnapshot;
use super::source::{CredentialPriority, CredentialSource};
use crate::config::StaticKeysConfig;
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const STATIC_KEYS_KIND: &str = "static";

/// Provider wrapping a fixed snapshot
#[derive(Debug)]
pub struct StaticCredentialsProvider {
    id: String,
    profile: String,
    snapshot: CredentialSnapshot,
}

impl StaticCredentialsProvider {
    pub fn new(profile: impl Into<String>, snapshot: CredentialSnapshot) -> Self {
        let profile = profile.into();
        Self {
            id: format!("{}:{}", STATIC_KEYS_KIND, profile),
            profile,
            snapshot,
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        format!("Static keys: {}", self.profile)
    }

    async fn resolve(&self) -> ToolkitResult<CredentialSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Factory for profiles that have keys configured directly
#[derive(Debug, Default)]
pub struct StaticCredentialsFactory {
    keys: HashMap<String, StaticKeysConfig>,
}

impl StaticCredentialsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured static profiles
    pub fn from_config(profiles: &HashMap<String, StaticKeysConfig>) -> Self {
        Self {
            keys: profiles.clone(),
        }
    }

    /// Add keys for a profile identifier
    pub fn with_keys(mut self, profile: impl Into<String>, keys: StaticKeysConfig) -> Self {
        self.keys.insert(profile.into(), keys);
        self
    }
}

impl CredentialSourceFactory for StaticCredentialsFactory {
    fn kind(&self) -> &str {
        STATIC_KEYS_KIND
    }

    fn priority(&self) -> CredentialPriority {
        CredentialPriority::StaticKeys
    }

    fn produce_provider(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider> {
        let config = self.keys.get(profile).ok_or_else(|| {
            ToolkitError::unavailable(STATIC_KEYS_KIND, profile, "no static keys configured")
        })?;

        if config.access_key_id.is_empty() {
            return Err(ToolkitError::configuration_field(
                profile,
                "access_key_id",
                "static access key is empty",
            ));
        }
        if config.secret_access_key.is_empty() {
            return Err(ToolkitError::configuration_field(
                profile,
                "secret_access_key",
                "static secret key is empty",
            ));
        }

        let snapshot = CredentialSnapshot::new(
            &config.access_key_id,
            &config.secret_access_key,
            config.session_token.clone(),
            CredentialSource::static_keys(profile),
        );
        Ok(Arc::new(StaticCredentialsProvider::new(profile, snapshot)))
    }

    fn known_profiles(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys.keys().cloned().collect();
        names.sort();
        names
    }
}
