//! Credential provider registry
//!
//! Factories are registered at start-up. Resolving a profile walks them in
//! priority order (ties broken by registration order); the first factory that
//! produces a provider wins and the provider is memoized per profile.


use super::provider::{CredentialProvider, CredentialSourceFactory, SharedCredentialProvider};
use super::snapshot::CredentialSnapshot;
use super::source::CredentialPriority;
use crate::error::{FactoryFailure, ToolkitError, ToolkitResult};
use crate::events::{SharedEventBus, ToolkitEvent};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct RegisteredFactory {
    factory: Arc<dyn CredentialSourceFactory>,
    priority: CredentialPriority,
    seq: usize,
}

/// Ordered set of credential factories plus the provider memo
pub struct CredentialRegistry {
    factories: RwLock<Vec<RegisteredFactory>>,
    providers: DashMap<String, SharedCredentialProvider>,
    events: SharedEventBus,
}

impl std::fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRegistry")
            .field("factories", &self.factory_kinds())
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl CredentialRegistry {
    pub fn new(events: SharedEventBus) -> Self {
        Self {
            factories: RwLock::new(Vec::new()),
            providers: DashMap::new(),
            events,
        }
    }

    /// Register a factory at its own priority
    pub fn register(&self, factory: Arc<dyn CredentialSourceFactory>) -> ToolkitResult<()> {
        let priority = factory.priority();
        self.register_with_priority(factory, priority)
    }

    /// Register a factory at an explicit priority
    pub fn register_with_priority(
        &self,
        factory: Arc<dyn CredentialSourceFactory>,
        priority: CredentialPriority,
    ) -> ToolkitResult<()> {
        let mut factories = self.factories.write();
        let kind = factory.kind().to_string();
        if factories.iter().any(|f| f.factory.kind() == kind) {
            return Err(ToolkitError::duplicate_kind(kind));
        }

        let seq = factories.len();
        factories.push(RegisteredFactory {
            factory,
            priority,
            seq,
        });
        factories.sort_by_key(|f| (f.priority, f.seq));
        debug!(kind = %kind, priority = %priority, "Registered credential factory");
        Ok(())
    }

    /// Factory kinds in resolution order
    pub fn factory_kinds(&self) -> Vec<String> {
        self.factories
            .read()
            .iter()
            .map(|f| f.factory.kind().to_string())
            .collect()
    }

    /// Union of profile names the factories know, sorted
    pub fn known_profiles(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .iter()
            .flat_map(|f| f.factory.known_profiles())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Memoized provider for `profile`, if one was resolved already
    pub fn cached_provider(&self, profile: &str) -> Option<SharedCredentialProvider> {
        self.providers.get(profile).map(|p| p.value().clone())
    }

    /// Provider for `profile`
    ///
    /// The first factory that produces a provider wins. When none does, the
    /// error lists every factory's reason, configuration problems included.
    pub fn resolve(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider> {
        if let Some(provider) = self.cached_provider(profile) {
            return Ok(provider);
        }

        let factories: Vec<(Arc<dyn CredentialSourceFactory>, CredentialPriority)> = self
            .factories
            .read()
            .iter()
            .map(|f| (f.factory.clone(), f.priority))
            .collect();

        let mut reasons = Vec::new();
        for (factory, priority) in factories {
            match factory.produce_provider(profile) {
                Ok(provider) => {
                    info!(
                        profile = %profile,
                        kind = %factory.kind(),
                        priority = %priority,
                        provider = %provider.id(),
                        "Resolved credential provider"
                    );
                    let provider = self
                        .providers
                        .entry(profile.to_string())
                        .or_insert(provider)
                        .value()
                        .clone();
                    return Ok(provider);
                }
                Err(err @ ToolkitError::Configuration { .. }) => {
                    warn!(profile = %profile, kind = %factory.kind(), error = %err, "Profile is misconfigured, trying next source");
                    reasons.push(FactoryFailure::new(factory.kind(), failure_reason(&err)));
                }
                Err(err) => {
                    debug!(profile = %profile, kind = %factory.kind(), reason = %err, "Factory does not apply");
                    reasons.push(FactoryFailure::new(factory.kind(), failure_reason(&err)));
                }
            }
        }

        Err(ToolkitError::no_credentials(profile, reasons))
    }

    /// Resolve the provider and then its credentials
    pub async fn resolve_credentials(&self, profile: &str) -> ToolkitResult<CredentialSnapshot> {
        let provider = self.resolve(profile)?;
        provider.resolve().await
    }

    /// Drop the memoized provider for `profile`
    ///
    /// Always publishes `CredentialsChanged` so dependants can drop derived
    /// state. Returns whether a provider was memoized.
    pub fn invalidate(&self, profile: &str) -> bool {
        let removed = self.providers.remove(profile);
        let provider_id = removed.as_ref().map(|(_, p)| p.id().to_string());
        debug!(profile = %profile, provider = ?provider_id, "Invalidated credential provider");
        self.events
            .publish(ToolkitEvent::credentials_changed(profile, provider_id));
        removed.is_some()
    }

    /// Drop every memoized provider; returns how many were dropped
    pub fn invalidate_all(&self) -> usize {
        let profiles: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        for profile in &profiles {
            self.invalidate(profile);
        }
        profiles.len()
    }

    /// Ask every factory to re-read its configuration
    ///
    /// Changed profiles are invalidated and announced with `ProfilesReloaded`.
    /// Reload failures are logged and reported after every factory was asked.
    pub fn reload_profiles(&self) -> ToolkitResult<Vec<String>> {
        let factories: Vec<Arc<dyn CredentialSourceFactory>> = self
            .factories
            .read()
            .iter()
            .map(|f| f.factory.clone())
            .collect();

        let mut changed = Vec::new();
        let mut first_error = None;
        for factory in factories {
            match factory.reload() {
                Ok(names) => changed.extend(names),
                Err(err) => {
                    warn!(kind = %factory.kind(), error = %err, "Factory reload failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        changed.sort();
        changed.dedup();

        for profile in &changed {
            self.invalidate(profile);
        }
        if !changed.is_empty() {
            info!(changed = ?changed, "Profiles reloaded");
            self.events.publish(ToolkitEvent::ProfilesReloaded {
                changed: changed.clone(),
            });
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }
}

fn failure_reason(err: &ToolkitError) -> String {
    match err {
        ToolkitError::Unavailable { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
