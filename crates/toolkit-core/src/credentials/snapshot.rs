//! Immutable credential values

use super::source::CredentialSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Snapshots are treated as expired this long before their real expiry
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// A usable set of credentials at one point in time
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    /// `None` means the credentials never expire
    expires_at: Option<DateTime<Utc>>,
    source: CredentialSource,
}

impl CredentialSnapshot {
    /// Create long-lived credentials
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        source: CredentialSource,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.filter(|t| !t.is_empty()),
            expires_at: None,
            source,
        }
    }

    /// Set an expiry instant
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Replace the recorded origin
    pub fn with_source(mut self, source: CredentialSource) -> Self {
        self.source = source;
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Check expiry against `now`, treating the snapshot as expired `buffer` early
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expires_at {
            // A buffer wider than the calendar can express covers any expiry
            Some(expiry) => chrono::Duration::from_std(buffer)
                .ok()
                .and_then(|buffer| expiry.checked_sub_signed(buffer))
                .is_none_or(|deadline| deadline <= now),
            None => false,
        }
    }

    /// Check expiry against the current time
    pub fn is_expired(&self, buffer: Duration) -> bool {
        self.is_expired_at(Utc::now(), buffer)
    }

    /// Remaining lifetime, `None` for non-expiring credentials
    pub fn remaining_lifetime(&self) -> Option<chrono::Duration> {
        self.expires_at.map(|expiry| expiry - Utc::now())
    }

    /// Access key with everything but the last four characters hidden
    pub fn masked_access_key(&self) -> String {
        let visible: String = self
            .access_key_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}

// Manual Debug implementation to avoid exposing secrets
impl fmt::Debug for CredentialSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSnapshot")
            .field("access_key_id", &self.masked_access_key())
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("source", &self.source)
            .finish()
    }
}
