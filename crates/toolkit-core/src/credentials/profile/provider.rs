//! Providers backed by the shared profile files

use super::chain::{BaseCredentials, ProfileChain, build_chain};
use super::model::{ProfileFiles, ProfileSet, keys};
use super::PROFILE_KIND;
use crate::credentials::challenge::{ChallengeContext, SharedChallengeHandler, run_challenge};
use crate::credentials::environment::{self, EnvLookup};
use crate::credentials::provider::{
    CredentialProvider, CredentialSourceFactory, ProviderStatus, SharedCredentialProvider,
};
use crate::credentials::refresh::SnapshotCell;
use crate::credentials::snapshot::{CredentialSnapshot, DEFAULT_EXPIRY_BUFFER};
use crate::credentials::source::{CredentialPriority, CredentialSource};
use crate::credentials::sts::{AssumeRoleRequest, SharedRoleAssumer};
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables shared by every profile provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileProviderSettings {
    pub expiry_buffer: Duration,
    /// Prefix for generated role session names
    pub session_name_prefix: String,
    /// Region used for role calls when the profile names none
    pub default_region: Option<String>,
}

impl Default for ProfileProviderSettings {
    fn default() -> Self {
        Self {
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            session_name_prefix: "toolkit".to_string(),
            default_region: None,
        }
    }
}

/// Provider for one named profile
pub struct ProfileCredentialsProvider {
    id: String,
    profile: String,
    chain: ProfileChain,
    cell: SnapshotCell,
    role_assumer: Option<SharedRoleAssumer>,
    challenge_handler: Option<SharedChallengeHandler>,
    env: EnvLookup,
    settings: ProfileProviderSettings,
}

impl fmt::Debug for ProfileCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileCredentialsProvider")
            .field("id", &self.id)
            .field("chain", &self.chain.profiles())
            .field("status", &self.cell.status())
            .finish()
    }
}

impl ProfileCredentialsProvider {
    pub fn chain(&self) -> &ProfileChain {
        &self.chain
    }

    fn session_name(&self) -> String {
        format!(
            "{}-{}",
            self.settings.session_name_prefix,
            Utc::now().timestamp_millis()
        )
    }

    fn base_snapshot(&self) -> ToolkitResult<CredentialSnapshot> {
        match &self.chain.base {
            BaseCredentials::Static {
                profile,
                keys,
                origin,
            } => Ok(CredentialSnapshot::new(
                &keys.access_key_id,
                &keys.secret_access_key,
                keys.session_token.clone(),
                CredentialSource::profile_file(profile, origin.clone()),
            )),
            BaseCredentials::Environment => environment::read_snapshot(&self.env, &self.profile)
                .map_err(|e| {
                    ToolkitError::configuration_field(
                        &self.profile,
                        keys::CREDENTIAL_SOURCE,
                        format!("credential_source is Environment but {}", e),
                    )
                }),
        }
    }

    /// Walk the chain from the base outwards
    ///
    /// Each MFA-protected hop asks for a code exactly once per derivation.
    async fn derive(&self) -> ToolkitResult<CredentialSnapshot> {
        let mut credentials = self.base_snapshot()?;

        for hop in &self.chain.hops {
            let assumer = self.role_assumer.as_ref().ok_or_else(|| {
                ToolkitError::configuration_field(
                    &hop.profile,
                    keys::ROLE_ARN,
                    "no role assumption client is configured",
                )
            })?;

            let token_code = match &hop.mfa_serial {
                Some(serial) => {
                    let handler = self.challenge_handler.clone().ok_or_else(|| {
                        ToolkitError::configuration_field(
                            &hop.profile,
                            keys::MFA_SERIAL,
                            "MFA is required but no challenge handler is configured",
                        )
                    })?;
                    Some(run_challenge(handler, ChallengeContext::new(&self.profile, serial)).await?)
                }
                None => None,
            };

            let request = AssumeRoleRequest {
                profile: hop.profile.clone(),
                role_arn: hop.role_arn.clone(),
                session_name: hop
                    .session_name
                    .clone()
                    .unwrap_or_else(|| self.session_name()),
                external_id: hop.external_id.clone(),
                serial_number: hop.mfa_serial.clone(),
                token_code,
                duration_seconds: hop.duration_seconds,
                region: hop
                    .region
                    .clone()
                    .or_else(|| self.settings.default_region.clone()),
                source_credentials: credentials,
            };

            info!(profile = %hop.profile, role_arn = %hop.role_arn, "Assuming role");
            credentials = assumer
                .assume_role(request)
                .await?
                .with_source(CredentialSource::assumed_role(&hop.profile, &hop.role_arn));
        }

        Ok(credentials)
    }
}

#[async_trait]
impl CredentialProvider for ProfileCredentialsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        format!("Profile: {}", self.profile)
    }

    async fn resolve(&self) -> ToolkitResult<CredentialSnapshot> {
        self.cell.get_or_refresh(|| self.derive()).await
    }

    fn status(&self) -> ProviderStatus {
        self.cell.status()
    }
}

/// Factory serving the profiles defined in the shared files
pub struct ProfileCredentialsFactory {
    files: Option<ProfileFiles>,
    profiles: RwLock<ProfileSet>,
    role_assumer: Option<SharedRoleAssumer>,
    challenge_handler: Option<SharedChallengeHandler>,
    env: EnvLookup,
    settings: ProfileProviderSettings,
}

impl fmt::Debug for ProfileCredentialsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileCredentialsFactory")
            .field("files", &self.files)
            .field("profiles", &self.profiles.read().names())
            .field("role_assumer", &self.role_assumer.is_some())
            .field("challenge_handler", &self.challenge_handler.is_some())
            .finish()
    }
}

impl ProfileCredentialsFactory {
    /// Load profiles from disk
    pub fn load(files: ProfileFiles) -> ToolkitResult<Self> {
        let profiles = ProfileSet::load(&files)?;
        let mut factory = Self::from_profiles(profiles);
        factory.files = Some(files);
        Ok(factory)
    }

    /// Serve a fixed, in-memory profile set
    pub fn from_profiles(profiles: ProfileSet) -> Self {
        Self {
            files: None,
            profiles: RwLock::new(profiles),
            role_assumer: None,
            challenge_handler: None,
            env: environment::process_env(),
            settings: ProfileProviderSettings::default(),
        }
    }

    pub fn with_role_assumer(mut self, assumer: SharedRoleAssumer) -> Self {
        self.role_assumer = Some(assumer);
        self
    }

    pub fn with_challenge_handler(mut self, handler: SharedChallengeHandler) -> Self {
        self.challenge_handler = Some(handler);
        self
    }

    /// Environment used by `credential_source = Environment`
    pub fn with_env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn with_settings(mut self, settings: ProfileProviderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn files(&self) -> Option<&ProfileFiles> {
        self.files.as_ref()
    }

    /// Copy of the current profile set
    pub fn profiles(&self) -> ProfileSet {
        self.profiles.read().clone()
    }
}

impl CredentialSourceFactory for ProfileCredentialsFactory {
    fn kind(&self) -> &str {
        PROFILE_KIND
    }

    fn priority(&self) -> CredentialPriority {
        CredentialPriority::ProfileFile
    }

    fn produce_provider(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider> {
        let chain = build_chain(&self.profiles.read(), profile)?;

        if let Some(hop) = chain.hops.first() {
            if self.role_assumer.is_none() {
                return Err(ToolkitError::configuration_field(
                    &hop.profile,
                    keys::ROLE_ARN,
                    "no role assumption client is configured",
                ));
            }
        }
        if let Some(hop) = chain.hops.iter().find(|h| h.mfa_serial.is_some()) {
            if self.challenge_handler.is_none() {
                return Err(ToolkitError::configuration_field(
                    &hop.profile,
                    keys::MFA_SERIAL,
                    "MFA is required but no challenge handler is configured",
                ));
            }
        }

        debug!(profile = %profile, chain = ?chain.profiles(), "Profile chain built");
        Ok(Arc::new(ProfileCredentialsProvider {
            id: format!("{}:{}", PROFILE_KIND, profile),
            profile: profile.to_string(),
            chain,
            cell: SnapshotCell::new(profile, self.settings.expiry_buffer),
            role_assumer: self.role_assumer.clone(),
            challenge_handler: self.challenge_handler.clone(),
            env: self.env.clone(),
            settings: self.settings.clone(),
        }))
    }

    fn known_profiles(&self) -> Vec<String> {
        self.profiles.read().names()
    }

    /// Re-read both files; a parse failure keeps the previous profiles
    fn reload(&self) -> ToolkitResult<Vec<String>> {
        let Some(files) = &self.files else {
            return Ok(Vec::new());
        };

        let next = ProfileSet::load(files).inspect_err(|e| {
            warn!(error = %e, "Keeping previous profiles after reload failure");
        })?;

        let mut current = self.profiles.write();
        let changed = current.changed_profiles(&next);
        *current = next;
        if !changed.is_empty() {
            info!(changed = ?changed, "Shared profiles changed");
        }
        Ok(changed)
    }
}
