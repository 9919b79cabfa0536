//! Credential provider and factory traits

use super::snapshot::CredentialSnapshot;
use super::source::CredentialPriority;
use crate::error::ToolkitResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Observable lifecycle state of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Nothing derived yet, or the last snapshot was discarded
    Unresolved,
    /// A derivation is running
    Resolving,
    /// Holding a snapshot that is still usable
    Valid,
    /// Holding a snapshot that must be refreshed before use
    Expired,
    /// Configuration is broken; the provider must be recreated
    Failed,
}

/// Something that can produce credential snapshots for one profile identifier
///
/// Implementations own whatever cached snapshot they hold. `resolve` must
/// never return a snapshot that is already expired.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Stable identity, used as the credential part of cache keys
    fn id(&self) -> &str;

    /// Label for presentation layers
    fn display_name(&self) -> String;

    /// Produce a usable snapshot, refreshing it if needed
    async fn resolve(&self) -> ToolkitResult<CredentialSnapshot>;

    /// Current lifecycle state
    fn status(&self) -> ProviderStatus {
        ProviderStatus::Unresolved
    }
}

/// Shared handle to a provider
pub type SharedCredentialProvider = Arc<dyn CredentialProvider>;

/// One credential-acquisition strategy
///
/// Factories are registered once at start-up and are immutable afterwards.
/// `produce_provider` must be cheap and side-effect free: it only decides
/// whether this strategy applies to `profile`. All I/O happens in the
/// provider's `resolve`.
pub trait CredentialSourceFactory: Send + Sync {
    /// Unique kind tag
    fn kind(&self) -> &str;

    /// Default position in the resolution order
    fn priority(&self) -> CredentialPriority;

    /// Build a provider for `profile`, or explain why this source cannot
    fn produce_provider(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider>;

    /// Profile identifiers this source knows by name
    fn known_profiles(&self) -> Vec<String> {
        Vec::new()
    }

    /// Re-read backing configuration; returns the profiles whose definition changed
    fn reload(&self) -> ToolkitResult<Vec<String>> {
        Ok(Vec::new())
    }
}
