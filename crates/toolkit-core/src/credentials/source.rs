//! Credential source definitions with priority-based resolution
//!
//! Every factory carries a [`CredentialPriority`]; the registry walks
//! factories from the highest priority (lowest number) to the lowest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Priority level for credential sources (lower number = higher priority)
///
/// The priority order is:
/// 1. Explicit static keys (highest priority)
/// 2. Shared profile files, including role chaining
/// 3. Environment variables
/// 4. System properties (lowest priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CredentialPriority {
    /// Keys configured directly in toolkit settings
    StaticKeys = 1,
    /// `~/.aws/credentials` and `~/.aws/config`
    ProfileFile = 2,
    /// AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
    Environment = 3,
    /// aws.accessKeyId / aws.secretAccessKey
    SystemProperty = 4,
}

impl CredentialPriority {
    /// Get all priority levels in order
    pub fn all() -> &'static [CredentialPriority] {
        &[
            CredentialPriority::StaticKeys,
            CredentialPriority::ProfileFile,
            CredentialPriority::Environment,
            CredentialPriority::SystemProperty,
        ]
    }

    /// Get the human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CredentialPriority::StaticKeys => "Static keys",
            CredentialPriority::ProfileFile => "Profile file",
            CredentialPriority::Environment => "Environment variables",
            CredentialPriority::SystemProperty => "System properties",
        }
    }

    /// Numeric rank, lower wins
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for CredentialPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a credential snapshot came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    /// Keys configured in toolkit settings for a profile identifier
    StaticKeys { profile: String },
    /// Long-lived keys read from a profile file
    ProfileFile { profile: String, path: Option<PathBuf> },
    /// Temporary credentials from role assumption
    AssumedRole { profile: String, role_arn: String },
    /// Environment variables
    Environment { var_name: String },
    /// Process system properties
    SystemProperty { property: String },
}

impl CredentialSource {
    /// Create a static keys source
    pub fn static_keys(profile: impl Into<String>) -> Self {
        CredentialSource::StaticKeys {
            profile: profile.into(),
        }
    }

    /// Create a profile file source
    pub fn profile_file(profile: impl Into<String>, path: Option<PathBuf>) -> Self {
        CredentialSource::ProfileFile {
            profile: profile.into(),
            path,
        }
    }

    /// Create an assumed role source
    pub fn assumed_role(profile: impl Into<String>, role_arn: impl Into<String>) -> Self {
        CredentialSource::AssumedRole {
            profile: profile.into(),
            role_arn: role_arn.into(),
        }
    }

    /// Create an environment variable source
    pub fn env(var_name: impl Into<String>) -> Self {
        CredentialSource::Environment {
            var_name: var_name.into(),
        }
    }

    /// Create a system property source
    pub fn system_property(property: impl Into<String>) -> Self {
        CredentialSource::SystemProperty {
            property: property.into(),
        }
    }

    /// Get the priority of this source
    pub fn priority(&self) -> CredentialPriority {
        match self {
            CredentialSource::StaticKeys { .. } => CredentialPriority::StaticKeys,
            CredentialSource::ProfileFile { .. } | CredentialSource::AssumedRole { .. } => {
                CredentialPriority::ProfileFile
            }
            CredentialSource::Environment { .. } => CredentialPriority::Environment,
            CredentialSource::SystemProperty { .. } => CredentialPriority::SystemProperty,
        }
    }

    /// Get a description of where this credential came from
    pub fn description(&self) -> String {
        match self {
            CredentialSource::StaticKeys { profile } => format!("Static keys: {}", profile),
            CredentialSource::ProfileFile { profile, path } => match path {
                Some(p) => format!("Profile {}: {}", profile, p.display()),
                None => format!("Profile {}", profile),
            },
            CredentialSource::AssumedRole { profile, role_arn } => {
                format!("Role {} via profile {}", role_arn, profile)
            }
            CredentialSource::Environment { var_name } => format!("Environment: ${}", var_name),
            CredentialSource::SystemProperty { property } => {
                format!("System property: {}", property)
            }
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
