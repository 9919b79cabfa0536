//! Credentials from environment variables

use super::provider::{CredentialProvider, CredentialSourceFactory, SharedCredentialProvider};
use super::snapshot::CredentialSnapshot;
use super::source::{CredentialPriority, CredentialSource};
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const ENVIRONMENT_KIND: &str = "environment";

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Variable lookup, swappable so tests never touch the real process environment
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub(crate) fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok())
}

pub(crate) fn read_snapshot(lookup: &EnvLookup, profile: &str) -> ToolkitResult<CredentialSnapshot> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let access_key = non_empty(ACCESS_KEY_ID_VAR).ok_or_else(|| {
        ToolkitError::unavailable(
            ENVIRONMENT_KIND,
            profile,
            format!("{} is not set", ACCESS_KEY_ID_VAR),
        )
    })?;
    let secret_key = non_empty(SECRET_ACCESS_KEY_VAR).ok_or_else(|| {
        ToolkitError::unavailable(
            ENVIRONMENT_KIND,
            profile,
            format!("{} is not set", SECRET_ACCESS_KEY_VAR),
        )
    })?;

    Ok(CredentialSnapshot::new(
        access_key,
        secret_key,
        non_empty(SESSION_TOKEN_VAR),
        CredentialSource::env(ACCESS_KEY_ID_VAR),
    ))
}

/// Provider reading the environment on every resolution
pub struct EnvironmentCredentialsProvider {
    profile: String,
    lookup: EnvLookup,
}

impl fmt::Debug for EnvironmentCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentCredentialsProvider")
            .field("profile", &self.profile)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for EnvironmentCredentialsProvider {
    fn id(&self) -> &str {
        ENVIRONMENT_KIND
    }

    fn display_name(&self) -> String {
        "Environment variables".to_string()
    }

    async fn resolve(&self) -> ToolkitResult<CredentialSnapshot> {
        read_snapshot(&self.lookup, &self.profile)
    }
}

/// Factory serving any profile identifier while the variables are set
pub struct EnvironmentCredentialsFactory {
    lookup: EnvLookup,
}

impl EnvironmentCredentialsFactory {
    /// Read the real process environment
    pub fn new() -> Self {
        Self {
            lookup: process_env(),
        }
    }

    /// Read variables through `lookup`
    pub fn with_lookup(lookup: EnvLookup) -> Self {
        Self { lookup }
    }
}

impl Default for EnvironmentCredentialsFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSourceFactory for EnvironmentCredentialsFactory {
    fn kind(&self) -> &str {
        ENVIRONMENT_KIND
    }

    fn priority(&self) -> CredentialPriority {
        CredentialPriority::Environment
    }

    fn produce_provider(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider> {
        read_snapshot(&self.lookup, profile)?;
        debug!(profile = %profile, "Environment credentials available");
        Ok(Arc::new(EnvironmentCredentialsProvider {
            profile: profile.to_string(),
            lookup: self.lookup.clone(),
        }))
    }
}
