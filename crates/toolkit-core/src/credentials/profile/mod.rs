//! Shared credentials/config profile files

mod chain;
mod model;
mod parser;
mod provider;
mod watcher;

/// Factory kind for profile-file credentials
pub const PROFILE_KIND: &str = "profile";

pub use chain::{BaseCredentials, CREDENTIAL_SOURCE_ENVIRONMENT, ProfileChain, RoleHop, build_chain};
pub use model::{
    CONFIG_FILE_VAR, CREDENTIALS_FILE_VAR, Profile, ProfileFiles, ProfileKeys, ProfileSet, keys,
};
pub use parser::{FileKind, RawProfile, parse_profile_file};
pub use provider::{ProfileCredentialsFactory, ProfileCredentialsProvider, ProfileProviderSettings};
pub use watcher::{DEFAULT_DEBOUNCE, ProfileWatcher, spawn_reload_task};
