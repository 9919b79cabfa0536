//! Reload profiles when the shared files change on disk

use super::model::ProfileFiles;
use crate::credentials::registry::CredentialRegistry;
use crate::error::{ToolkitError, ToolkitResult};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watched file, matched by directory and file name
#[derive(Debug, Clone)]
struct WatchedFile {
    dir: PathBuf,
    name: OsString,
}

impl WatchedFile {
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_os_string();
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty())?;
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        Some(Self { dir, name })
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name() == Some(self.name.as_os_str()) && path.starts_with(&self.dir)
    }
}

/// Debounced watcher over the credentials and config files
///
/// The parent directories are watched rather than the files, so files that
/// are created, replaced or deleted are all noticed.
pub struct ProfileWatcher {
    #[allow(dead_code)]
    debouncer: Debouncer<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<PathBuf>,
    watched_dirs: Vec<PathBuf>,
}

impl ProfileWatcher {
    pub fn new(files: &ProfileFiles, debounce: Duration) -> ToolkitResult<Self> {
        let watched: Vec<WatchedFile> = files
            .paths()
            .iter()
            .filter_map(|p| WatchedFile::from_path(p))
            .collect();

        let (tx, events) = mpsc::unbounded_channel();
        let filter = watched.clone();
        let mut debouncer = new_debouncer(
            debounce,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(batch) => {
                    for event in batch {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }
                        if filter.iter().any(|f| f.matches(&event.path)) {
                            if let Err(e) = tx.send(event.path) {
                                debug!("Profile watcher receiver dropped: {}", e);
                            }
                        }
                    }
                }
                Err(e) => error!("Profile watcher error: {}", e),
            },
        )
        .map_err(|e| ToolkitError::Io(format!("Failed to create profile watcher: {}", e)))?;

        let mut watched_dirs: Vec<PathBuf> = Vec::new();
        for file in &watched {
            if watched_dirs.contains(&file.dir) {
                continue;
            }
            if !file.dir.is_dir() {
                debug!(dir = %file.dir.display(), "Profile directory missing, not watching");
                continue;
            }
            debouncer
                .watcher()
                .watch(&file.dir, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    ToolkitError::Io(format!("Failed to watch {}: {}", file.dir.display(), e))
                })?;
            info!(dir = %file.dir.display(), "Watching profile directory");
            watched_dirs.push(file.dir.clone());
        }

        Ok(Self {
            debouncer,
            events,
            watched_dirs,
        })
    }

    /// Next changed file; `None` once the watcher is gone
    pub async fn next_change(&mut self) -> Option<PathBuf> {
        self.events.recv().await
    }

    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }
}

/// Reload the registry's profiles whenever the watcher reports a change
pub fn spawn_reload_task(
    mut watcher: ProfileWatcher,
    registry: Arc<CredentialRegistry>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                change = watcher.next_change() => {
                    let Some(path) = change else { break };
                    info!(path = %path.display(), "Profile file changed");
                    if let Err(e) = registry.reload_profiles() {
                        warn!(error = %e, "Profile reload failed");
                    }
                }
            }
        }
        debug!("Profile reload task stopped");
    })
}
