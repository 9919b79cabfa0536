//! Credentials from process-level system properties
//!
//! The host sets properties at start-up (for example from command-line
//! switches). The store is an explicit object handed to the factory rather
//! than a global.

use super::provider::{CredentialProvider, CredentialSourceFactory, SharedCredentialProvider};
use super::snapshot::CredentialSnapshot;
use super::source::{CredentialPriority, CredentialSource};
use crate::error::{ToolkitError, ToolkitResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub const SYSTEM_PROPERTY_KIND: &str = "system_property";

pub const ACCESS_KEY_ID_PROPERTY: &str = "aws.accessKeyId";
pub const SECRET_ACCESS_KEY_PROPERTY: &str = "aws.secretAccessKey";
/// Older spelling still accepted for the secret key
pub const SECRET_KEY_PROPERTY_ALIAS: &str = "aws.secretKey";
pub const SESSION_TOKEN_PROPERTY: &str = "aws.sessionToken";

/// Shared key/value property store
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SystemProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let props = SystemProperties::new();
        for (k, v) in iter {
            props.set(k, v);
        }
        props
    }
}

fn read_snapshot(props: &SystemProperties, profile: &str) -> ToolkitResult<CredentialSnapshot> {
    let access_key = props.non_empty(ACCESS_KEY_ID_PROPERTY).ok_or_else(|| {
        ToolkitError::unavailable(
            SYSTEM_PROPERTY_KIND,
            profile,
            format!("{} is not set", ACCESS_KEY_ID_PROPERTY),
        )
    })?;
    let secret_key = props
        .non_empty(SECRET_ACCESS_KEY_PROPERTY)
        .or_else(|| props.non_empty(SECRET_KEY_PROPERTY_ALIAS))
        .ok_or_else(|| {
            ToolkitError::unavailable(
                SYSTEM_PROPERTY_KIND,
                profile,
                format!("{} is not set", SECRET_ACCESS_KEY_PROPERTY),
            )
        })?;

    Ok(CredentialSnapshot::new(
        access_key,
        secret_key,
        props.non_empty(SESSION_TOKEN_PROPERTY),
        CredentialSource::system_property(ACCESS_KEY_ID_PROPERTY),
    ))
}

/// Provider reading the property store on every resolution
#[derive(Debug)]
pub struct SystemPropertyCredentialsProvider {
    profile: String,
    properties: SystemProperties,
}

#[async_trait]
impl CredentialProvider for SystemPropertyCredentialsProvider {
    fn id(&self) -> &str {
        SYSTEM_PROPERTY_KIND
    }

    fn display_name(&self) -> String {
        "System properties".to_string()
    }

    async fn resolve(&self) -> ToolkitResult<CredentialSnapshot> {
        read_snapshot(&self.properties, &self.profile)
    }
}

/// Factory serving any profile identifier while the properties are set
#[derive(Debug, Clone)]
pub struct SystemPropertyCredentialsFactory {
    properties: SystemProperties,
}

impl SystemPropertyCredentialsFactory {
    pub fn new(properties: SystemProperties) -> Self {
        Self { properties }
    }
}

impl CredentialSourceFactory for SystemPropertyCredentialsFactory {
    fn kind(&self) -> &str {
        SYSTEM_PROPERTY_KIND
    }

    fn priority(&self) -> CredentialPriority {
        CredentialPriority::SystemProperty
    }

    fn produce_provider(&self, profile: &str) -> ToolkitResult<SharedCredentialProvider> {
        read_snapshot(&self.properties, profile)?;
        Ok(Arc::new(SystemPropertyCredentialsProvider {
            profile: profile.to_string(),
            properties: self.properties.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_from_properties() {
        let props: SystemProperties = [
            (ACCESS_KEY_ID_PROPERTY, "AKIAPROP"),
            (SECRET_ACCESS_KEY_PROPERTY, "propsecret"),
        ]
        .into_iter()
        .collect();

        let factory = SystemPropertyCredentialsFactory::new(props);
        let snapshot = factory.produce_provider("dev").unwrap().resolve().await.unwrap();
        assert_eq!(snapshot.access_key_id(), "AKIAPROP");
        assert!(snapshot.session_token().is_none());
    }

    #[tokio::test]
    async fn test_secret_key_alias() {
        let props: SystemProperties = [
            (ACCESS_KEY_ID_PROPERTY, "AKIAPROP"),
            (SECRET_KEY_PROPERTY_ALIAS, "legacy"),
        ]
        .into_iter()
        .collect();

        let snapshot = SystemPropertyCredentialsFactory::new(props)
            .produce_provider("dev")
            .unwrap()
            .resolve()
            .await
            .unwrap();
        assert_eq!(snapshot.secret_access_key(), "legacy");
    }

    #[tokio::test]
    async fn test_provider_sees_later_changes() {
        let props = SystemProperties::new();
        props.set(ACCESS_KEY_ID_PROPERTY, "AKIAPROP");
        props.set(SECRET_ACCESS_KEY_PROPERTY, "one");

        let provider = SystemPropertyCredentialsFactory::new(props.clone())
            .produce_provider("dev")
            .unwrap();
        props.set(SECRET_ACCESS_KEY_PROPERTY, "two");
        assert_eq!(provider.resolve().await.unwrap().secret_access_key(), "two");

        props.remove(ACCESS_KEY_ID_PROPERTY);
        assert!(provider.resolve().await.is_err());
    }
}
