//! Development-mode change watcher.
//!
//! Every source file that converts successfully gets its own watch. When the
//! file changes, the full conversion runs again for that file alone.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use handover_core::{ConversionHook, Mode, Pipeline};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default quiet period before a change is acted on.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to start file watcher: {0}")]
    Notify(#[from] notify::Error),
    #[error("cannot resolve source root {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source paths (relative to the source root) whose contents changed.
pub type ChangeEvents = mpsc::Receiver<PathBuf>;

/// Registers one watch per converted source file.
pub struct ChangeWatcher {
    source_root: PathBuf,
    registry: Mutex<HashSet<PathBuf>>,
    debouncer: Mutex<Debouncer<RecommendedWatcher>>,
}

impl ChangeWatcher {
    /// Create a watcher for files below `source_root`. Changes are delivered
    /// on the returned channel as paths relative to the source root.
    pub fn new<P: AsRef<Path>>(
        source_root: P,
        debounce: Duration,
    ) -> Result<(Arc<Self>, ChangeEvents), WatchError> {
        let source_root = resolve_root(source_root.as_ref())?;
        let (tx, rx) = mpsc::channel(100);

        let root = source_root.clone();
        let debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    match relative_source(&root, &event.path) {
                        Some(relative) => {
                            let _ = tx.blocking_send(relative);
                        }
                        None => warn!(
                            path = %event.path.display(),
                            "ignoring change outside {}: {}",
                            root.display(),
                            event.path.display()
                        ),
                    }
                }
            }
            Err(err) => warn!("file watcher error: {err}"),
        })?;

        let watcher = Arc::new(Self {
            source_root,
            registry: Mutex::new(HashSet::new()),
            debouncer: Mutex::new(debouncer),
        });

        Ok((watcher, rx))
    }

    /// A watcher only exists in development mode.
    pub fn for_mode<P: AsRef<Path>>(
        mode: Mode,
        source_root: P,
        debounce: Duration,
    ) -> Result<Option<(Arc<Self>, ChangeEvents)>, WatchError> {
        if mode.watches() {
            Self::new(source_root, debounce).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn is_watching(&self, source: &Path) -> bool {
        self.registry().contains(source)
    }

    pub fn watched_count(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, source: &Path) -> Result<bool, notify::Error> {
        let mut registry = self.registry();
        if registry.contains(source) {
            return Ok(false);
        }

        let full_path = self.source_root.join(source);
        self.debouncer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watcher()
            .watch(&full_path, RecursiveMode::NonRecursive)?;
        registry.insert(source.to_path_buf());
        Ok(true)
    }
}

/// Absolute, symlink-free form of the source root. A root that does not
/// exist yet is only made absolute.
fn resolve_root(root: &Path) -> Result<PathBuf, WatchError> {
    std::fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .map_err(|source| WatchError::Root {
            path: root.to_path_buf(),
            source,
        })
}

/// Map a path reported by the OS back to a path relative to `root`.
///
/// `root` must already be canonical. Deleted files can't be canonicalized,
/// so their parent directory is resolved instead.
fn relative_source(root: &Path, path: &Path) -> Option<PathBuf> {
    let resolved = std::fs::canonicalize(path).ok().or_else(|| {
        let parent = std::fs::canonicalize(path.parent()?).ok()?;
        Some(parent.join(path.file_name()?))
    })?;

    resolved
        .strip_prefix(root)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

impl ConversionHook for ChangeWatcher {
    fn converted(&self, source: &Path) {
        match self.register(source) {
            Ok(true) => debug!(path = %source.display(), "watching {}", source.display()),
            Ok(false) => {}
            Err(err) => warn!(
                path = %source.display(),
                "can't watch {}: {err}",
                source.display()
            ),
        }
    }
}

/// Convert each changed file again until the event channel closes.
pub async fn serve(pipeline: Arc<Pipeline>, mut events: ChangeEvents) {
    while let Some(source) = events.recv().await {
        info!(path = %source.display(), "{} changed, converting again", source.display());
        pipeline.run_file(&source).await;
    }
}
