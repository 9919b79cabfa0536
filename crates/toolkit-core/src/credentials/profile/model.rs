//! Parsed profiles merged from the shared config and credentials files

use super::parser::{FileKind, RawProfile, parse_profile_file};
use crate::error::{ToolkitError, ToolkitResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CREDENTIALS_FILE_VAR: &str = "AWS_SHARED_CREDENTIALS_FILE";
pub const CONFIG_FILE_VAR: &str = "AWS_CONFIG_FILE";

pub mod keys {
    pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub const SESSION_TOKEN: &str = "aws_session_token";
    pub const ROLE_ARN: &str = "role_arn";
    pub const SOURCE_PROFILE: &str = "source_profile";
    pub const CREDENTIAL_SOURCE: &str = "credential_source";
    pub const MFA_SERIAL: &str = "mfa_serial";
    pub const ROLE_SESSION_NAME: &str = "role_session_name";
    pub const EXTERNAL_ID: &str = "external_id";
    pub const DURATION_SECONDS: &str = "duration_seconds";
    pub const REGION: &str = "region";
}

/// Locations of the two shared files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFiles {
    pub credentials: PathBuf,
    pub config: PathBuf,
}

impl ProfileFiles {
    pub fn new(credentials: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            credentials: credentials.into(),
            config: config.into(),
        }
    }

    /// `~/.aws/credentials` and `~/.aws/config`, overridable by environment
    pub fn default_locations() -> Self {
        let aws_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aws");
        let from_env = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| PathBuf::from(shellexpand::tilde(&v).as_ref()))
        };

        Self {
            credentials: from_env(CREDENTIALS_FILE_VAR)
                .unwrap_or_else(|| aws_dir.join("credentials")),
            config: from_env(CONFIG_FILE_VAR).unwrap_or_else(|| aws_dir.join("config")),
        }
    }

    pub fn paths(&self) -> [&Path; 2] {
        [&self.credentials, &self.config]
    }
}

/// Static keys read from a profile
#[derive(Clone, PartialEq, Eq)]
pub struct ProfileKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for ProfileKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// One named profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    properties: BTreeMap<String, String>,
    /// File that supplied the static keys, when any
    keys_origin: Option<PathBuf>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            keys_origin: None,
        }
    }

    /// Add a property (builder style, mostly for tests)
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_lowercase(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys_origin(&self) -> Option<&Path> {
        self.keys_origin.as_deref()
    }

    /// Property value; empty values count as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.get(keys::ROLE_ARN)
    }

    pub fn source_profile(&self) -> Option<&str> {
        self.get(keys::SOURCE_PROFILE)
    }

    pub fn credential_source(&self) -> Option<&str> {
        self.get(keys::CREDENTIAL_SOURCE)
    }

    pub fn mfa_serial(&self) -> Option<&str> {
        self.get(keys::MFA_SERIAL)
    }

    pub fn region(&self) -> Option<&str> {
        self.get(keys::REGION)
    }

    /// Requested role session lifetime
    pub fn duration_seconds(&self) -> ToolkitResult<Option<u32>> {
        self.get(keys::DURATION_SECONDS)
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    ToolkitError::configuration_field(
                        &self.name,
                        keys::DURATION_SECONDS,
                        format!("'{}' is not a number of seconds", raw),
                    )
                })
            })
            .transpose()
    }

    /// Static keys, if the profile carries them
    ///
    /// Having only one of the access/secret pair is a configuration error.
    pub fn static_keys(&self) -> ToolkitResult<Option<ProfileKeys>> {
        match (self.get(keys::ACCESS_KEY_ID), self.get(keys::SECRET_ACCESS_KEY)) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ToolkitError::configuration_field(
                &self.name,
                keys::SECRET_ACCESS_KEY,
                "access key is set but secret key is missing",
            )),
            (None, Some(_)) => Err(ToolkitError::configuration_field(
                &self.name,
                keys::ACCESS_KEY_ID,
                "secret key is set but access key is missing",
            )),
            (Some(access), Some(secret)) => Ok(Some(ProfileKeys {
                access_key_id: access.to_string(),
                secret_access_key: secret.to_string(),
                session_token: self.get(keys::SESSION_TOKEN).map(str::to_string),
            })),
        }
    }

    /// Short human description of how the profile gets credentials
    pub fn summary(&self) -> String {
        match (self.role_arn(), self.mfa_serial()) {
            (Some(role), Some(_)) => format!("role {} (MFA)", role),
            (Some(role), None) => format!("role {}", role),
            (None, _) if self.get(keys::ACCESS_KEY_ID).is_some() => "static keys".to_string(),
            _ => "settings only".to_string(),
        }
    }

    fn merge(&mut self, raw: RawProfile, origin: &Path) {
        if raw.contains_key(keys::ACCESS_KEY_ID) {
            self.keys_origin = Some(origin.to_path_buf());
        }
        self.properties.extend(raw);
    }
}

/// All profiles visible to the toolkit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and merge both files; missing files are treated as empty
    ///
    /// Properties from the credentials file win over the config file.
    pub fn load(files: &ProfileFiles) -> ToolkitResult<Self> {
        let mut set = Self::new();
        set.merge_file(&files.config, FileKind::Config)?;
        set.merge_file(&files.credentials, FileKind::Credentials)?;
        debug!(profiles = set.len(), "Loaded shared profiles");
        Ok(set)
    }

    fn merge_file(&mut self, path: &Path, kind: FileKind) -> ToolkitResult<()> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Profile file not present");
                return Ok(());
            }
            Err(e) => {
                return Err(ToolkitError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        for (name, raw) in parse_profile_file(path, &contents, kind)? {
            self.profiles
                .entry(name.clone())
                .or_insert_with(|| Profile::new(name))
                .merge(raw, path);
        }
        Ok(())
    }

    /// Add or replace a profile
    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.insert(profile);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Sorted profile names
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles whose effective credentials differ between `self` and `next`
    ///
    /// A profile counts as changed when its own definition changed or when any
    /// profile it sources from changed.
    pub fn changed_profiles(&self, next: &ProfileSet) -> Vec<String> {
        let mut changed: Vec<String> = self
            .profiles
            .keys()
            .chain(next.profiles.keys())
            .filter(|name| self.profiles.get(*name) != next.profiles.get(*name))
            .cloned()
            .collect();
        changed.sort();
        changed.dedup();

        loop {
            let dependents: Vec<String> = self
                .iter()
                .chain(next.iter())
                .filter(|p| !changed.iter().any(|c| c == p.name()))
                .filter(|p| {
                    p.source_profile()
                        .is_some_and(|src| changed.iter().any(|c| c == src))
                })
                .map(|p| p.name().to_string())
                .collect();
            if dependents.is_empty() {
                break;
            }
            changed.extend(dependents);
            changed.sort();
            changed.dedup();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_files(credentials: &str, config: &str) -> (TempDir, ProfileFiles) {
        let dir = TempDir::new().unwrap();
        let files = ProfileFiles::new(dir.path().join("credentials"), dir.path().join("config"));
        fs::write(&files.credentials, credentials).unwrap();
        fs::write(&files.config, config).unwrap();
        (dir, files)
    }

    #[test]
    fn test_credentials_override_config() {
        let (_dir, files) = write_files(
            "[dev]\naws_access_key_id = AKIACRED\naws_secret_access_key = secret\nregion = eu-west-1\n",
            "[profile dev]\nregion = us-east-1\nmfa_serial = arn:aws:iam::123:mfa/me\n",
        );

        let set = ProfileSet::load(&files).unwrap();
        let dev = set.get("dev").unwrap();
        assert_eq!(dev.region(), Some("eu-west-1"));
        assert_eq!(dev.mfa_serial(), Some("arn:aws:iam::123:mfa/me"));
        assert_eq!(dev.keys_origin(), Some(files.credentials.as_path()));
        assert_eq!(
            dev.static_keys().unwrap().unwrap().access_key_id,
            "AKIACRED"
        );
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let files = ProfileFiles::new(dir.path().join("nope"), dir.path().join("nada"));
        assert!(ProfileSet::load(&files).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_propagates() {
        let (_dir, files) = write_files("[dev]\nnot a property\n", "");
        assert!(matches!(
            ProfileSet::load(&files),
            Err(ToolkitError::ProfileParse { line: 2, .. })
        ));
    }

    #[test]
    fn test_partial_static_keys() {
        let profile = Profile::new("dev").with(keys::ACCESS_KEY_ID, "AKIA");
        match profile.static_keys().unwrap_err() {
            ToolkitError::Configuration { field, .. } => {
                assert_eq!(field.as_deref(), Some(keys::SECRET_ACCESS_KEY))
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_duration() {
        let profile = Profile::new("dev").with(keys::DURATION_SECONDS, "an hour");
        assert!(profile.duration_seconds().is_err());
        let profile = Profile::new("dev").with(keys::DURATION_SECONDS, "3600");
        assert_eq!(profile.duration_seconds().unwrap(), Some(3600));
    }

    #[test]
    fn test_changed_profiles_follow_source_links() {
        let before = ProfileSet::new()
            .with_profile(Profile::new("base").with(keys::ACCESS_KEY_ID, "A"))
            .with_profile(Profile::new("dev").with(keys::SOURCE_PROFILE, "base"))
            .with_profile(Profile::new("prod").with(keys::SOURCE_PROFILE, "dev"))
            .with_profile(Profile::new("other").with(keys::ACCESS_KEY_ID, "O"));
        let after = before
            .clone()
            .with_profile(Profile::new("base").with(keys::ACCESS_KEY_ID, "B"))
            .with_profile(Profile::new("new").with(keys::ACCESS_KEY_ID, "N"));

        assert_eq!(
            before.changed_profiles(&after),
            vec!["base", "dev", "new", "prod"]
        );
        assert!(before.changed_profiles(&before).is_empty());
    }
}
