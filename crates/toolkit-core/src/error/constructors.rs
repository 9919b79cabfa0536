//! Constructor methods for ToolkitError

use super::types::{FactoryFailure, ToolkitError};
use std::path::Path;

impl ToolkitError {
    /// Create a configuration error that is not tied to a single field
    pub fn configuration(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            profile: profile.into(),
            field: None,
            message: message.into(),
        }
    }

    /// Create a configuration error pointing at a specific field
    pub fn configuration_field(
        profile: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            profile: profile.into(),
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Create an aggregated "no credentials" error
    pub fn no_credentials(profile: impl Into<String>, reasons: Vec<FactoryFailure>) -> Self {
        Self::NoCredentialsFound {
            profile: profile.into(),
            reasons,
        }
    }

    /// Create a "source does not apply" error
    pub fn unavailable(
        kind: impl Into<String>,
        profile: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unavailable {
            kind: kind.into(),
            profile: profile.into(),
            reason: reason.into(),
        }
    }

    /// Create a cancelled-challenge error
    pub fn challenge_cancelled(profile: impl Into<String>) -> Self {
        Self::ChallengeCancelled {
            profile: profile.into(),
        }
    }

    /// Create a transient remote failure
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientRemote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an expired-credentials error
    pub fn expired(profile: impl Into<String>) -> Self {
        Self::ExpiredCredentials {
            profile: profile.into(),
        }
    }

    /// Create a duplicate-kind registration error
    pub fn duplicate_kind(kind: impl Into<String>) -> Self {
        Self::DuplicateKind { kind: kind.into() }
    }

    /// Create a profile file parse error
    pub fn profile_parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::ProfileParse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    /// Create a settings error, optionally naming the offending field
    pub fn settings(field: Option<&str>, message: impl Into<String>) -> Self {
        Self::Settings {
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }
}
