//! Resolution plan for a profile
//!
//! A profile either carries static keys or assumes a role on top of some base
//! credentials. Role profiles name their base with `source_profile` (another
//! profile, possibly a role itself) or `credential_source`. Walking those
//! links yields a base plus an ordered list of role hops.

use super::model::{Profile, ProfileKeys, ProfileSet, keys};
use super::PROFILE_KIND;
use crate::error::{ToolkitError, ToolkitResult};
use std::path::PathBuf;

/// `credential_source` value for environment variables
pub const CREDENTIAL_SOURCE_ENVIRONMENT: &str = "Environment";

/// Credentials at the bottom of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseCredentials {
    /// Keys stored in a profile
    Static {
        profile: String,
        keys: ProfileKeys,
        origin: Option<PathBuf>,
    },
    /// `credential_source = Environment`
    Environment,
}

/// One role assumption step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHop {
    pub profile: String,
    pub role_arn: String,
    pub session_name: Option<String>,
    pub external_id: Option<String>,
    pub mfa_serial: Option<String>,
    pub duration_seconds: Option<u32>,
    pub region: Option<String>,
}

impl RoleHop {
    fn from_profile(profile: &Profile, role_arn: &str) -> ToolkitResult<Self> {
        Ok(Self {
            profile: profile.name().to_string(),
            role_arn: role_arn.to_string(),
            session_name: profile.get(keys::ROLE_SESSION_NAME).map(str::to_string),
            external_id: profile.get(keys::EXTERNAL_ID).map(str::to_string),
            mfa_serial: profile.mfa_serial().map(str::to_string),
            duration_seconds: profile.duration_seconds()?,
            region: profile.region().map(str::to_string),
        })
    }
}

/// Base credentials plus role hops, ordered from the base outwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChain {
    pub base: BaseCredentials,
    pub hops: Vec<RoleHop>,
}

impl ProfileChain {
    /// Whether any hop needs an MFA code
    pub fn requires_mfa(&self) -> bool {
        self.hops.iter().any(|hop| hop.mfa_serial.is_some())
    }

    /// Profile names from the requested one down to the base
    pub fn profiles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hops.iter().rev().map(|h| h.profile.as_str()).collect();
        if let BaseCredentials::Static { profile, .. } = &self.base {
            if names.last() != Some(&profile.as_str()) {
                names.push(profile);
            }
        }
        names
    }
}

fn static_base(profile: &Profile) -> ToolkitResult<BaseCredentials> {
    let keys = profile.static_keys()?.ok_or_else(|| {
        ToolkitError::configuration_field(
            profile.name(),
            keys::ACCESS_KEY_ID,
            "profile has neither static keys nor role_arn",
        )
    })?;
    Ok(BaseCredentials::Static {
        profile: profile.name().to_string(),
        keys,
        origin: profile.keys_origin().map(|p| p.to_path_buf()),
    })
}

/// Build the chain for `name`
///
/// A profile that does not exist is reported as unavailable; every other
/// problem is a configuration error naming the offending profile and field.
pub fn build_chain(set: &ProfileSet, name: &str) -> ToolkitResult<ProfileChain> {
    let mut visited: Vec<String> = Vec::new();
    let mut hops = Vec::new();
    let mut current = set
        .get(name)
        .ok_or_else(|| ToolkitError::unavailable(PROFILE_KIND, name, "profile not found"))?;

    let base = loop {
        visited.push(current.name().to_string());

        let Some(role_arn) = current.role_arn() else {
            break static_base(current)?;
        };
        hops.push(RoleHop::from_profile(current, role_arn)?);

        match (current.source_profile(), current.credential_source()) {
            (Some(_), Some(_)) => {
                return Err(ToolkitError::configuration_field(
                    current.name(),
                    keys::CREDENTIAL_SOURCE,
                    "source_profile and credential_source are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(ToolkitError::configuration_field(
                    current.name(),
                    keys::SOURCE_PROFILE,
                    "role_arn requires source_profile or credential_source",
                ));
            }
            (None, Some(CREDENTIAL_SOURCE_ENVIRONMENT)) => break BaseCredentials::Environment,
            (None, Some(other)) => {
                return Err(ToolkitError::configuration_field(
                    current.name(),
                    keys::CREDENTIAL_SOURCE,
                    format!("unsupported credential_source '{}'", other),
                ));
            }
            // A role profile may source its own static keys
            (Some(source), None) if source == current.name() => break static_base(current)?,
            (Some(source), None) => {
                if visited.iter().any(|v| v == source) {
                    visited.push(source.to_string());
                    return Err(ToolkitError::configuration_field(
                        name,
                        keys::SOURCE_PROFILE,
                        format!("source_profile loop: {}", visited.join(" -> ")),
                    ));
                }
                current = set.get(source).ok_or_else(|| {
                    ToolkitError::configuration_field(
                        current.name(),
                        keys::SOURCE_PROFILE,
                        format!("source profile '{}' does not exist", source),
                    )
                })?;
            }
        }
    };

    hops.reverse();
    Ok(ProfileChain { base, hops })
}
