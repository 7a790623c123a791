// src/system/watcher.rs

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while starting a [`DirectoryWatcher`].
#[derive(Error, Debug)]
pub enum WatchError {
    /// The OS watch could not be registered.
    #[error("Could not watch '{path}': {source}")]
    Notify {
        /// The directory.
        path: PathBuf,
        /// The underlying `notify` error.
        #[source]
        source: notify::Error,
    },
    /// The debounce thread could not be spawned.
    #[error("Could not start the watcher thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Decides whether a changed path is worth reporting.
pub type PathFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Watches a directory and invokes a callback once per burst of relevant events.
///
/// Events are coalesced until `debounce` passes without a new one. Dropping the
/// watcher stops the OS watch and joins the worker; no callback fires afterwards.
pub struct DirectoryWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Starts watching `root`. `on_change` runs on the debounce thread once per
    /// burst that starts with a non-access event on a path accepted by `filter`.
    pub fn watch<F>(
        root: &Path,
        recursive: bool,
        debounce: Duration,
        filter: PathFilter,
        on_change: F,
    ) -> Result<Self, WatchError>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Event>();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => log::debug!("Watcher error: {}", e),
            }
        })
        .map_err(|source| WatchError::Notify {
            path: root.to_path_buf(),
            source,
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root, mode).map_err(|source| WatchError::Notify {
            path: root.to_path_buf(),
            source,
        })?;

        let relevant = move |event: &Event| {
            !matches!(event.kind, EventKind::Access(_))
                && (event.paths.is_empty() || event.paths.iter().any(|p| filter(p)))
        };

        let worker = std::thread::Builder::new()
            .name("shellbent-watcher".to_string())
            .spawn(move || {
                loop {
                    // Wait for the first relevant event of a burst.
                    match rx.recv() {
                        Ok(event) if relevant(&event) => {}
                        Ok(_) => continue,
                        Err(_) => return,
                    }
                    // Then let the burst settle.
                    loop {
                        match rx.recv_timeout(debounce) {
                            Ok(_) => continue,
                            Err(mpsc::RecvTimeoutError::Timeout) => break,
                            Err(mpsc::RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    on_change();
                }
            })?;

        log::debug!("Watching '{}' (recursive: {}).", root.display(), recursive);

        Ok(Self {
            root: root.to_path_buf(),
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }

    /// The watched directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        // Dropping the OS watcher drops the sender, which ends the worker loop.
        drop(self.watcher.take());
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
        log::debug!("Stopped watching '{}'.", self.root.display());
    }
}

impl fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .finish()
    }
}

/// A filter accepting every path.
pub fn any_path() -> PathFilter {
    Arc::new(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_watcher_reports_changes_and_stops_on_drop() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let watcher = DirectoryWatcher::watch(
            dir.path(),
            true,
            Duration::from_millis(50),
            any_path(),
            move || {
                let _ = tx.send(());
            },
        )
        .unwrap();

        // --- Execute ---
        std::fs::write(dir.path().join("HEAD"), "ref: refs/heads/main").unwrap();

        // --- Assert ---
        assert!(rx.recv_timeout(WAIT).is_ok());

        drop(watcher);
        std::fs::write(dir.path().join("HEAD"), "ref: refs/heads/other").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn test_filtered_paths_do_not_fire() {
        let dir = tempdir().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let filter: PathFilter = Arc::new(|p: &Path| p.extension().is_none_or(|e| e != "lock"));
        let _watcher = DirectoryWatcher::watch(
            dir.path(),
            false,
            Duration::from_millis(50),
            filter,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        std::fs::write(dir.path().join("index.lock"), "x").unwrap();
        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
