//! Start-up wiring
//!
//! [`ToolkitContext`] owns the event bus, credential registry and resource
//! cache for the life of the process. Build it once from [`ToolkitConfig`]
//! and hand clones of the shared pieces to whoever needs them.

use crate::cache::ResourceCache;
use crate::config::{ToolkitConfig, validate};
use crate::credentials::environment::{EnvLookup, EnvironmentCredentialsFactory};
use crate::credentials::profile::{
    ProfileCredentialsFactory, ProfileProviderSettings, ProfileWatcher, spawn_reload_task,
};
use crate::credentials::static_keys::StaticCredentialsFactory;
use crate::credentials::system_property::{SystemProperties, SystemPropertyCredentialsFactory};
use crate::credentials::{CredentialRegistry, SharedChallengeHandler, SharedRoleAssumer};
use crate::error::ToolkitResult;
use crate::events::{EventBus, SharedEventBus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builder for [`ToolkitContext`]
pub struct ToolkitContextBuilder {
    config: ToolkitConfig,
    role_assumer: Option<SharedRoleAssumer>,
    challenge_handler: Option<SharedChallengeHandler>,
    system_properties: SystemProperties,
    env: Option<EnvLookup>,
    background_tasks: bool,
}

impl ToolkitContextBuilder {
    pub fn new(config: ToolkitConfig) -> Self {
        Self {
            config,
            role_assumer: None,
            challenge_handler: None,
            system_properties: SystemProperties::new(),
            env: None,
            background_tasks: true,
        }
    }

    /// Client used for `role_arn` profiles
    pub fn with_role_assumer(mut self, assumer: SharedRoleAssumer) -> Self {
        self.role_assumer = Some(assumer);
        self
    }

    /// Handler asked for MFA codes
    pub fn with_challenge_handler(mut self, handler: SharedChallengeHandler) -> Self {
        self.challenge_handler = Some(handler);
        self
    }

    pub fn with_system_properties(mut self, properties: SystemProperties) -> Self {
        self.system_properties = properties;
        self
    }

    /// Replace the process environment, mostly for tests
    pub fn with_env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = Some(env);
        self
    }

    /// Skip the cache sweeper and profile watcher
    pub fn without_background_tasks(mut self) -> Self {
        self.background_tasks = false;
        self
    }

    fn profile_settings(&self) -> ProfileProviderSettings {
        ProfileProviderSettings {
            expiry_buffer: self.config.credentials.expiry_buffer,
            session_name_prefix: self.config.credentials.role_session_prefix.clone(),
            default_region: self.config.default_region.clone(),
        }
    }

    fn build_profile_factory(&self) -> ToolkitResult<ProfileCredentialsFactory> {
        let mut factory = ProfileCredentialsFactory::load(self.config.profiles.files())?
            .with_settings(self.profile_settings());
        if let Some(assumer) = &self.role_assumer {
            factory = factory.with_role_assumer(assumer.clone());
        }
        if let Some(handler) = &self.challenge_handler {
            factory = factory.with_challenge_handler(handler.clone());
        }
        if let Some(env) = &self.env {
            factory = factory.with_env_lookup(env.clone());
        }
        Ok(factory)
    }

    /// Register every configured source with `registry`
    fn register_sources(&self, registry: &CredentialRegistry) -> ToolkitResult<()> {
        registry.register(Arc::new(StaticCredentialsFactory::from_config(
            &self.config.credentials.static_profiles,
        )))?;
        registry.register(Arc::new(self.build_profile_factory()?))?;

        if self.config.credentials.enable_environment {
            let factory = match &self.env {
                Some(env) => EnvironmentCredentialsFactory::with_lookup(env.clone()),
                None => EnvironmentCredentialsFactory::new(),
            };
            registry.register(Arc::new(factory))?;
        }
        if self.config.credentials.enable_system_properties {
            registry.register(Arc::new(SystemPropertyCredentialsFactory::new(
                self.system_properties.clone(),
            )))?;
        }
        Ok(())
    }

    /// Validate the configuration and wire everything together
    ///
    /// Background tasks need a running tokio runtime.
    pub fn build(self) -> ToolkitResult<ToolkitContext> {
        validate(&self.config)?;

        let events: SharedEventBus = Arc::new(EventBus::new(self.config.events.capacity));
        let registry = Arc::new(CredentialRegistry::new(events.clone()));
        self.register_sources(&registry)?;

        let cache = Arc::new(ResourceCache::new(self.config.cache.default_ttl, events.clone()));
        let cancel = CancellationToken::new();
        let mut tasks = vec![cache.attach_to(&events)];

        if self.background_tasks {
            tasks.push(cache.spawn_sweeper(self.config.cache.sweep_interval, cancel.clone()));

            if self.config.profiles.watch {
                let files = self.config.profiles.files();
                match ProfileWatcher::new(&files, self.config.profiles.watch_debounce) {
                    Ok(watcher) => {
                        tasks.push(spawn_reload_task(watcher, registry.clone(), cancel.clone()));
                    }
                    Err(e) => warn!(error = %e, "Profile watching disabled"),
                }
            }
        }

        info!(
            sources = ?registry.factory_kinds(),
            cache_ttl = ?self.config.cache.default_ttl,
            "Toolkit context ready"
        );

        Ok(ToolkitContext {
            config: self.config,
            events,
            registry,
            cache,
            cancel,
            tasks,
            system_properties: self.system_properties,
        })
    }
}

/// Process-wide credential and cache services
pub struct ToolkitContext {
    config: ToolkitConfig,
    events: SharedEventBus,
    registry: Arc<CredentialRegistry>,
    cache: Arc<ResourceCache>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    system_properties: SystemProperties,
}

impl std::fmt::Debug for ToolkitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolkitContext")
            .field("sources", &self.registry.factory_kinds())
            .field("cache", &self.cache)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl ToolkitContext {
    pub fn builder(config: ToolkitConfig) -> ToolkitContextBuilder {
        ToolkitContextBuilder::new(config)
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn registry(&self) -> &Arc<CredentialRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Store read by the system-property source
    pub fn system_properties(&self) -> &SystemProperties {
        &self.system_properties
    }

    /// Stop background tasks and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        // The cache listener runs until the bus closes, so stop it directly
        if let Some(listener) = self.tasks.first() {
            listener.abort();
        }
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!(error = %e, "Background task failed");
                }
            }
        }
        debug!("Toolkit context shut down");
    }
}
