//! Toolkit Core Library
//!
//! Credential resolution for named cloud profiles and a single-flight cache
//! for remote lookups made with those credentials.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod resources;

// Re-export commonly used types
pub use bootstrap::{ToolkitContext, ToolkitContextBuilder};
pub use cache::{CacheKey, CacheStatistics, ResourceCache};
pub use config::{ToolkitConfig, load_config};
pub use credentials::{
    CredentialPriority, CredentialProvider, CredentialRegistry, CredentialSnapshot,
    CredentialSource, CredentialSourceFactory, InteractiveChallengeHandler, RoleAssumer,
    SharedCredentialProvider,
};
pub use error::{FactoryFailure, ToolkitError, ToolkitResult};
pub use events::{EventBus, SharedEventBus, ToolkitEvent};
pub use resources::RemoteLookupClient;
