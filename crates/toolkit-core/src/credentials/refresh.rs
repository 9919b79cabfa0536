//! Memoized, self-refreshing credential state
//!
//! [`SnapshotCell`] implements the provider lifecycle
//! `Unresolved -> Resolving -> Valid -> Expired -> Resolving -> ...` with an
//! absorbing `Failed` state for configuration errors. The state lock is held
//! across the derivation, so concurrent callers queue behind a single
//! in-flight derivation and then share its outcome.

use super::provider::ProviderStatus;
use super::snapshot::CredentialSnapshot;
use crate::error::{ToolkitError, ToolkitResult};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug)]
enum CellState {
    Unresolved,
    Valid(CredentialSnapshot),
    Failed(ToolkitError),
}

#[derive(Debug)]
struct Inner {
    state: CellState,
    /// Error from the most recent derivation, handed to callers that queued behind it
    last_error: Option<ToolkitError>,
}

/// Holder of one provider's cached snapshot
#[derive(Debug)]
pub struct SnapshotCell {
    label: String,
    expiry_buffer: Duration,
    inner: Mutex<Inner>,
    /// Completed derivations; read before queueing on the lock
    generation: AtomicU64,
}

impl SnapshotCell {
    /// Create an empty cell; `label` names the profile in errors and logs
    pub fn new(label: impl Into<String>, expiry_buffer: Duration) -> Self {
        Self {
            label: label.into(),
            expiry_buffer,
            inner: Mutex::new(Inner {
                state: CellState::Unresolved,
                last_error: None,
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached snapshot, or run `derive` to produce a fresh one
    ///
    /// At most one `derive` runs at a time. Callers that waited while another
    /// derivation ran receive that derivation's outcome instead of starting
    /// their own.
    pub async fn get_or_refresh<F, Fut>(&self, derive: F) -> ToolkitResult<CredentialSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ToolkitResult<CredentialSnapshot>>,
    {
        let observed = self.generation.load(Ordering::Acquire);
        let mut inner = self.inner.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(err) = &inner.last_error {
                return Err(err.clone());
            }
        }

        match &inner.state {
            CellState::Valid(snapshot) if !snapshot.is_expired(self.expiry_buffer) => {
                return Ok(snapshot.clone());
            }
            CellState::Valid(_) => {
                debug!(profile = %self.label, "Cached credentials expired, refreshing");
            }
            CellState::Failed(err) => return Err(err.clone()),
            CellState::Unresolved => {}
        }

        let outcome = derive().await;
        let outcome = match outcome {
            Ok(snapshot) if snapshot.is_expired(self.expiry_buffer) => {
                warn!(profile = %self.label, "Derived credentials are already expired");
                Err(ToolkitError::expired(&self.label))
            }
            other => other,
        };

        match &outcome {
            Ok(snapshot) => {
                inner.state = CellState::Valid(snapshot.clone());
                inner.last_error = None;
            }
            Err(err) if err.is_fatal() => {
                inner.state = CellState::Failed(err.clone());
                inner.last_error = Some(err.clone());
            }
            Err(err) => {
                inner.state = CellState::Unresolved;
                inner.last_error = Some(err.clone());
            }
        }
        self.generation.fetch_add(1, Ordering::Release);

        outcome
    }

    /// Current state without waiting
    pub fn status(&self) -> ProviderStatus {
        match self.inner.try_lock() {
            Err(_) => ProviderStatus::Resolving,
            Ok(inner) => match &inner.state {
                CellState::Unresolved => ProviderStatus::Unresolved,
                CellState::Valid(snapshot) if snapshot.is_expired(self.expiry_buffer) => {
                    ProviderStatus::Expired
                }
                CellState::Valid(_) => ProviderStatus::Valid,
                CellState::Failed(_) => ProviderStatus::Failed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::source::CredentialSource;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn fresh(minutes: i64) -> CredentialSnapshot {
        CredentialSnapshot::new("AKIA", "secret", None, CredentialSource::static_keys("dev"))
            .with_expiry(Utc::now() + chrono::Duration::minutes(minutes))
    }

    #[tokio::test]
    async fn test_valid_snapshot_is_reused() {
        let cell = SnapshotCell::new("dev", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cell.get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(fresh(30))
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.status(), ProviderStatus::Valid);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_refreshed() {
        let cell = SnapshotCell::new("dev", Duration::ZERO);
        let calls = AtomicUsize::new(0);

        let short_lived = || {
            CredentialSnapshot::new("AKIA", "secret", None, CredentialSource::static_keys("dev"))
                .with_expiry(Utc::now() + chrono::Duration::milliseconds(200))
        };

        let first = cell
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(short_lived())
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cell.status(), ProviderStatus::Expired);

        let second = cell
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(short_lived())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(second.expires_at() > first.expires_at());
    }

    #[tokio::test]
    async fn test_snapshot_inside_buffer_is_rejected() {
        let cell = SnapshotCell::new("dev", Duration::from_secs(60));

        // Valid for 30 more seconds, which is inside the one minute buffer
        let err = cell
            .get_or_refresh(|| async {
                Ok(CredentialSnapshot::new("AKIA", "s", None, CredentialSource::static_keys("dev"))
                    .with_expiry(Utc::now() + chrono::Duration::seconds(30)))
            })
            .await
            .unwrap_err();
        assert_eq!(err, ToolkitError::expired("dev"));
        assert_eq!(cell.status(), ProviderStatus::Unresolved);
    }

    #[tokio::test]
    async fn test_configuration_error_is_absorbing() {
        let cell = SnapshotCell::new("dev", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let err = cell
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ToolkitError::configuration("dev", "broken"))
                })
                .await
                .unwrap_err();
            assert!(err.is_fatal());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.status(), ProviderStatus::Failed);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_on_next_call() {
        let cell = SnapshotCell::new("dev", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let first = cell
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ToolkitError::transient("sts:AssumeRole", "throttled"))
            })
            .await;
        assert!(first.is_err());

        let second = cell
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(fresh(30))
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_failure() {
        let cell = Arc::new(SnapshotCell::new("dev", Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = cell.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_refresh(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Err(ToolkitError::challenge_cancelled("dev"))
                })
                .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
