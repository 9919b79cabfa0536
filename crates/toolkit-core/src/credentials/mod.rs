//! Credential resolution
//!
//! A [`CredentialRegistry`] holds the credential source factories. Each
//! factory decides whether it can serve a profile identifier and produces a
//! [`CredentialProvider`], which in turn yields [`CredentialSnapshot`]s.

pub mod challenge;
pub mod environment;
pub mod profile;
pub mod provider;
pub mod refresh;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod static_keys;
pub mod sts;
pub mod system_property;

pub use challenge::{
    ChallengeContext, ChallengeRequest, ChallengeResponse, ChannelChallengeHandler,
    InteractiveChallengeHandler, SharedChallengeHandler, StaticChallengeHandler, challenge_channel,
    run_challenge,
};
pub use environment::{ENVIRONMENT_KIND, EnvLookup, EnvironmentCredentialsFactory};
pub use profile::{
    PROFILE_KIND, ProfileCredentialsFactory, ProfileFiles, ProfileProviderSettings, ProfileSet,
    ProfileWatcher,
};
pub use provider::{
    CredentialProvider, CredentialSourceFactory, ProviderStatus, SharedCredentialProvider,
};
pub use refresh::SnapshotCell;
pub use registry::CredentialRegistry;
pub use snapshot::{CredentialSnapshot, DEFAULT_EXPIRY_BUFFER};
pub use source::{CredentialPriority, CredentialSource};
pub use static_keys::{STATIC_KEYS_KIND, StaticCredentialsFactory};
pub use sts::{AssumeRoleRequest, RoleAssumer, SharedRoleAssumer};
pub use system_property::{SYSTEM_PROPERTY_KIND, SystemProperties, SystemPropertyCredentialsFactory};
