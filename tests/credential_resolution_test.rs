//! Credential resolution scenarios
//!
//! Profiles are written to temporary files and resolved through a fully wired
//! context, the way a host application would use the toolkit.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use toolkit::config::ToolkitConfig;
use toolkit::credentials::challenge::StaticChallengeHandler;
use toolkit::credentials::environment::{EnvLookup, EnvironmentCredentialsFactory};
use toolkit::credentials::profile::{ProfileCredentialsFactory, ProfileFiles};
use toolkit::credentials::sts::AssumeRoleRequest;
use toolkit::{
    CredentialPriority, CredentialProvider, CredentialRegistry, CredentialSnapshot,
    CredentialSource, EventBus, RoleAssumer, ToolkitContext, ToolkitError, ToolkitEvent,
    ToolkitResult,
};

const DEV_ROLE: &str = "arn:aws:iam::123456789012:role/dev";
const MFA_DEVICE: &str = "arn:aws:iam::123456789012:mfa/alice";

/// Role assumer answering with session credentials and recording each call
#[derive(Default)]
struct RecordingAssumer {
    calls: AtomicUsize,
    token_codes: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl RoleAssumer for RecordingAssumer {
    async fn assume_role(&self, request: AssumeRoleRequest) -> ToolkitResult<CredentialSnapshot> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.token_codes.lock().unwrap().push(request.token_code.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(CredentialSnapshot::new(
            format!("ASIA{}", n),
            "session-secret",
            Some("session-token".to_string()),
            CredentialSource::assumed_role(&request.profile, &request.role_arn),
        )
        .with_expiry(Utc::now() + chrono::Duration::hours(1)))
    }
}

struct ProfileDir {
    dir: TempDir,
}

impl ProfileDir {
    fn new(credentials: &str, config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("credentials"), credentials).unwrap();
        fs::write(dir.path().join("config"), config).unwrap();
        Self { dir }
    }

    fn files(&self) -> ProfileFiles {
        ProfileFiles::new(self.dir.path().join("credentials"), self.dir.path().join("config"))
    }

    fn config(&self) -> ToolkitConfig {
        let mut config = ToolkitConfig::default();
        config.profiles.credentials_file = Some(self.dir.path().join("credentials"));
        config.profiles.config_file = Some(self.dir.path().join("config"));
        config.profiles.watch = false;
        config
    }
}

fn env_from(vars: &[(&str, &str)]) -> EnvLookup {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(move |name: &str| vars.get(name).cloned())
}

const DEV_KEYS: &str = "[dev]\naws_access_key_id = AKIADEV\naws_secret_access_key = dev-secret\n";

#[tokio::test]
async fn test_profile_outranks_environment_whatever_the_registration_order() {
    let profiles = ProfileDir::new(DEV_KEYS, "");
    let registry = CredentialRegistry::new(Arc::new(EventBus::default()));

    let env = env_from(&[
        ("AWS_ACCESS_KEY_ID", "AKIAENV"),
        ("AWS_SECRET_ACCESS_KEY", "env-secret"),
    ]);
    registry
        .register_with_priority(
            Arc::new(EnvironmentCredentialsFactory::with_lookup(env)),
            CredentialPriority::Environment,
        )
        .unwrap();
    registry
        .register_with_priority(
            Arc::new(ProfileCredentialsFactory::load(profiles.files()).unwrap()),
            CredentialPriority::ProfileFile,
        )
        .unwrap();

    assert_eq!(registry.factory_kinds(), vec!["profile", "environment"]);
    let snapshot = registry.resolve_credentials("dev").await.unwrap();
    assert_eq!(snapshot.access_key_id(), "AKIADEV");

    // Profiles the files do not know fall through to the environment
    let snapshot = registry.resolve_credentials("other").await.unwrap();
    assert_eq!(snapshot.access_key_id(), "AKIAENV");
}

#[tokio::test]
async fn test_profile_keys_used_when_environment_is_empty() {
    let profiles = ProfileDir::new(DEV_KEYS, "");
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .without_background_tasks()
        .build()
        .unwrap();

    let snapshot = context.registry().resolve_credentials("dev").await.unwrap();
    assert_eq!(snapshot.access_key_id(), "AKIADEV");
    assert_eq!(snapshot.secret_access_key(), "dev-secret");
    assert_eq!(snapshot.source().priority(), CredentialPriority::ProfileFile);
    assert!(snapshot.expires_at().is_none());

    context.shutdown().await;
}

#[tokio::test]
async fn test_unknown_profile_reports_every_source() {
    let profiles = ProfileDir::new(DEV_KEYS, "");
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .without_background_tasks()
        .build()
        .unwrap();

    match context.registry().resolve("missing") {
        Err(ToolkitError::NoCredentialsFound { profile, reasons }) => {
            assert_eq!(profile, "missing");
            let kinds: Vec<_> = reasons.iter().map(|r| r.kind.as_str()).collect();
            assert_eq!(kinds, vec!["static", "profile", "environment", "system_property"]);
        }
        other => panic!("expected NoCredentialsFound, got {:?}", other),
    }

    context.shutdown().await;
}

#[tokio::test]
async fn test_mfa_code_is_asked_for_once() {
    let config = format!(
        "[profile dev]\nrole_arn = {}\nsource_profile = base\nmfa_serial = {}\n",
        DEV_ROLE, MFA_DEVICE
    );
    let profiles = ProfileDir::new(
        "[base]\naws_access_key_id = AKIABASE\naws_secret_access_key = base-secret\n",
        &config,
    );
    let assumer = Arc::new(RecordingAssumer::default());
    let handler = Arc::new(StaticChallengeHandler::with_code("123456"));

    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .with_role_assumer(assumer.clone())
        .with_challenge_handler(handler.clone())
        .without_background_tasks()
        .build()
        .unwrap();

    let first = context.registry().resolve_credentials("dev").await.unwrap();
    let second = context.registry().resolve_credentials("dev").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.source(), &CredentialSource::assumed_role("dev", DEV_ROLE));
    assert!(first.expires_at().unwrap() > Utc::now());
    assert_eq!(handler.call_count(), 1);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*assumer.token_codes.lock().unwrap(), vec![Some("123456".to_string())]);

    context.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_share_one_role_assumption() {
    let config = format!("[profile dev]\nrole_arn = {}\nsource_profile = base\n", DEV_ROLE);
    let profiles = ProfileDir::new(
        "[base]\naws_access_key_id = AKIABASE\naws_secret_access_key = base-secret\n",
        &config,
    );
    let assumer = Arc::new(RecordingAssumer::default());
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .with_role_assumer(assumer.clone())
        .without_background_tasks()
        .build()
        .unwrap();

    let provider = context.registry().resolve("dev").unwrap();
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.resolve().await })
        })
        .collect();

    let mut keys = Vec::new();
    for task in tasks {
        keys.push(task.await.unwrap().unwrap().access_key_id().to_string());
    }
    assert!(keys.iter().all(|k| k == "ASIA0"));
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 1);

    context.shutdown().await;
}

#[tokio::test]
async fn test_invalidate_publishes_change() {
    let profiles = ProfileDir::new(DEV_KEYS, "");
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .without_background_tasks()
        .build()
        .unwrap();
    let mut events = context.events().subscribe();

    let provider = context.registry().resolve("dev").unwrap();
    assert!(context.registry().invalidate("dev"));

    assert_eq!(
        events.recv().await.unwrap(),
        ToolkitEvent::credentials_changed("dev", Some(provider.id().to_string()))
    );
    context.shutdown().await;
}

#[tokio::test]
async fn test_edited_profile_file_is_picked_up_on_reload() {
    let profiles = ProfileDir::new(DEV_KEYS, "");
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[]))
        .without_background_tasks()
        .build()
        .unwrap();

    let before = context.registry().resolve_credentials("dev").await.unwrap();
    assert_eq!(before.access_key_id(), "AKIADEV");

    fs::write(
        profiles.dir.path().join("credentials"),
        "[dev]\naws_access_key_id = AKIAROTATED\naws_secret_access_key = new-secret\n",
    )
    .unwrap();
    let changed = context.registry().reload_profiles().unwrap();
    assert_eq!(changed, vec!["dev".to_string()]);

    let after = context.registry().resolve_credentials("dev").await.unwrap();
    assert_eq!(after.access_key_id(), "AKIAROTATED");

    context.shutdown().await;
}

#[tokio::test]
async fn test_unusable_role_profile_falls_back_to_environment() {
    let config = format!("[profile dev]\nrole_arn = {}\nsource_profile = base\n", DEV_ROLE);
    let profiles = ProfileDir::new(
        "[base]\naws_access_key_id = AKIABASE\naws_secret_access_key = base-secret\n",
        &config,
    );
    // No role assumer is wired, so the profile source cannot serve `dev`
    let context = ToolkitContext::builder(profiles.config())
        .with_env_lookup(env_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIAENV"),
            ("AWS_SECRET_ACCESS_KEY", "env-secret"),
        ]))
        .without_background_tasks()
        .build()
        .unwrap();

    let snapshot = context.registry().resolve_credentials("dev").await.unwrap();
    assert_eq!(snapshot.access_key_id(), "AKIAENV");
    assert_eq!(snapshot.source().priority(), CredentialPriority::Environment);

    context.shutdown().await;
}
