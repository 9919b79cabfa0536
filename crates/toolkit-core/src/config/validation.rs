//! Settings validation

use super::model::ToolkitConfig;
use crate::error::{ToolkitError, ToolkitResult};
use std::time::Duration;

/// Longest generated role session name prefix; STS caps the full name at 64
const MAX_SESSION_PREFIX_LEN: usize = 32;

fn valid_session_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "+=,.@_-".contains(c)
}

fn non_zero(field: &str, value: Duration) -> ToolkitResult<()> {
    if value.is_zero() {
        return Err(ToolkitError::settings(Some(field), "must be greater than zero"));
    }
    Ok(())
}

/// Check settings for values the toolkit cannot work with
pub fn validate(config: &ToolkitConfig) -> ToolkitResult<()> {
    if config.events.capacity == 0 {
        return Err(ToolkitError::settings(
            Some("events.capacity"),
            "must be greater than zero",
        ));
    }

    non_zero("cache.default_ttl", config.cache.default_ttl)?;
    non_zero("cache.sweep_interval", config.cache.sweep_interval)?;
    non_zero("profiles.watch_debounce", config.profiles.watch_debounce)?;

    let prefix = &config.credentials.role_session_prefix;
    if prefix.is_empty()
        || prefix.len() > MAX_SESSION_PREFIX_LEN
        || !prefix.chars().all(valid_session_char)
    {
        return Err(ToolkitError::settings(
            Some("credentials.role_session_prefix"),
            format!(
                "'{}' must be 1-{} characters of letters, digits or +=,.@_-",
                prefix, MAX_SESSION_PREFIX_LEN
            ),
        ));
    }

    let mut names: Vec<&String> = config.credentials.static_profiles.keys().collect();
    names.sort();
    for name in names {
        let keys = &config.credentials.static_profiles[name];
        if name.trim().is_empty() {
            return Err(ToolkitError::settings(
                Some("credentials.static_profiles"),
                "profile name must not be empty",
            ));
        }
        for (key, value) in [
            ("access_key_id", &keys.access_key_id),
            ("secret_access_key", &keys.secret_access_key),
        ] {
            if value.trim().is_empty() {
                let field = format!("credentials.static_profiles.{}.{}", name, key);
                return Err(ToolkitError::settings(Some(field.as_str()), "must not be empty"));
            }
        }
    }

    if let Some(region) = &config.default_region {
        if region.trim().is_empty() {
            return Err(ToolkitError::settings(Some("default_region"), "must not be blank"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::StaticKeysConfig;

    fn field_of(err: ToolkitError) -> String {
        match err {
            ToolkitError::Settings { field, .. } => field.unwrap_or_default(),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&ToolkitConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_durations() {
        let mut config = ToolkitConfig::default();
        config.cache.default_ttl = Duration::ZERO;
        assert_eq!(field_of(validate(&config).unwrap_err()), "cache.default_ttl");
    }

    #[test]
    fn test_session_prefix() {
        let mut config = ToolkitConfig::default();
        config.credentials.role_session_prefix = "my ide".to_string();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "credentials.role_session_prefix"
        );

        config.credentials.role_session_prefix = "ide@corp.example".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_static_keys_named_in_error() {
        let mut config = ToolkitConfig::default();
        config.credentials.static_profiles.insert(
            "ci".to_string(),
            StaticKeysConfig {
                access_key_id: "AKIACI".to_string(),
                secret_access_key: " ".to_string(),
                session_token: None,
            },
        );
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "credentials.static_profiles.ci.secret_access_key"
        );
    }
}
