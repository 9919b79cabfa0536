//! Core error types for the toolkit

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for toolkit operations
pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Why a single factory could not produce a provider for a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryFailure {
    /// Kind tag of the factory that failed
    pub kind: String,
    /// Human-readable reason
    pub reason: String,
}

impl FactoryFailure {
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FactoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

fn join_failures(reasons: &[FactoryFailure]) -> String {
    if reasons.is_empty() {
        return "no credential sources are registered".to_string();
    }
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_ref()
        .map(|f| format!(" (field '{}')", f))
        .unwrap_or_default()
}

/// Main error type for credential resolution and resource caching
///
/// Every variant is `Clone` so a single failure can be fanned out to all
/// waiters of a shared in-flight operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    /// Malformed or missing configuration. Never retried.
    #[error("Configuration error in profile '{profile}'{}: {message}", field_suffix(.field))]
    Configuration {
        profile: String,
        field: Option<String>,
        message: String,
    },

    /// No registered factory could produce credentials for the profile
    #[error("No credentials found for profile '{profile}': {}", join_failures(.reasons))]
    NoCredentialsFound {
        profile: String,
        reasons: Vec<FactoryFailure>,
    },

    /// A source has nothing to offer for the profile; the registry moves on
    #[error("Credential source '{kind}' cannot serve profile '{profile}': {reason}")]
    Unavailable {
        kind: String,
        profile: String,
        reason: String,
    },

    /// The user declined the MFA prompt
    #[error("MFA challenge for profile '{profile}' was cancelled")]
    ChallengeCancelled { profile: String },

    /// Network or throttling failure from a remote call
    #[error("Remote call '{operation}' failed: {message}")]
    TransientRemote { operation: String, message: String },

    /// Credentials arrived already expired
    #[error("Credentials for profile '{profile}' are expired")]
    ExpiredCredentials { profile: String },

    /// A factory of the same kind is already registered
    #[error("A credential source of kind '{kind}' is already registered")]
    DuplicateKind { kind: String },

    /// Profile file syntax error
    #[error("Failed to parse {}:{line}: {message}", .path.display())]
    ProfileParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid toolkit settings file or override
    #[error("Invalid toolkit settings{}: {message}", field_suffix(.field))]
    Settings {
        field: Option<String>,
        message: String,
    },

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ToolkitError {
    /// Whether the caller may reasonably retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientRemote { .. } | Self::ExpiredCredentials { .. })
    }

    /// Whether this error leaves a provider permanently failed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::ProfileParse { .. } | Self::DuplicateKind { .. }
        )
    }

    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "TOOLKIT_CONFIGURATION",
            Self::NoCredentialsFound { .. } => "TOOLKIT_NO_CREDENTIALS",
            Self::Unavailable { .. } => "TOOLKIT_SOURCE_UNAVAILABLE",
            Self::ChallengeCancelled { .. } => "TOOLKIT_CHALLENGE_CANCELLED",
            Self::TransientRemote { .. } => "TOOLKIT_TRANSIENT_REMOTE",
            Self::ExpiredCredentials { .. } => "TOOLKIT_EXPIRED_CREDENTIALS",
            Self::DuplicateKind { .. } => "TOOLKIT_DUPLICATE_KIND",
            Self::ProfileParse { .. } => "TOOLKIT_PROFILE_PARSE",
            Self::Settings { .. } => "TOOLKIT_SETTINGS",
            Self::Cache(_) => "TOOLKIT_CACHE",
            Self::Io(_) => "TOOLKIT_IO",
            Self::Serialization(_) => "TOOLKIT_SERIALIZATION",
        }
    }
}

impl From<std::io::Error> for ToolkitError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for ToolkitError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for ToolkitError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_yaml::Error> for ToolkitError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
