//! Debounced, exclusion-aware workspace file watcher.
//!
//! `notify`'s callback runs on its own internal thread and is synchronous;
//! we bridge it into the async world with a bounded `std::sync::mpsc`
//! channel drained by a blocking-thread forwarder, matching the idiom used
//! elsewhere in this codebase for wrapping a callback-based API. Debouncing
//! (300 ms, latest-wins, Delete fires immediately) is implemented directly
//! with a `HashMap<PathBuf, JoinHandle>` of pending per-path timers rather
//! than a debouncer crate, since the immediate-delete carve-out isn't a
//! policy those crates expose.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher as NotifyWatcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const DEBOUNCE: Duration = Duration::from_millis(300);

const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "out",
    "bin",
    ".idea",
    ".vscode",
    ".cache",
    "coverage",
    "target",
    "vendor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct WatchedChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Owns the underlying OS watch handle; drop to stop watching.
pub struct Watcher {
    _inner: notify::RecommendedWatcher,
}

impl Watcher {
    pub fn spawn(root: PathBuf) -> notify::Result<(Self, mpsc::Receiver<WatchedChange>)> {
        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

        let mut inner = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;
        inner.watch(&root, RecursiveMode::Recursive)?;

        let (out_tx, out_rx) = mpsc::channel(256);
        let root_for_filter = root.clone();

        // Bridge the sync callback channel onto a blocking thread, then
        // debounce on the async side.
        let (bridge_tx, bridge_rx) = mpsc::channel(256);
        std::thread::spawn(move || {
            while let Ok(event) = raw_rx.recv() {
                if bridge_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        tokio::spawn(debounce_task(bridge_rx, out_tx, root_for_filter));

        Ok((Self { _inner: inner }, out_rx))
    }
}

async fn debounce_task(
    mut events: mpsc::Receiver<notify::Result<Event>>,
    out: mpsc::Sender<WatchedChange>,
    root: PathBuf,
) {
    let pending: Arc<Mutex<HashMap<PathBuf, JoinHandle<()>>>> = Arc::new(Mutex::new(HashMap::new()));

    while let Some(Ok(event)) = events.recv().await {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Deleted,
            _ => continue,
        };

        for path in event.paths {
            if is_excluded(&path, &root) {
                continue;
            }

            if kind == ChangeKind::Deleted {
                if let Some(handle) = pending.lock().remove(&path) {
                    handle.abort();
                }
                let _ = out
                    .send(WatchedChange {
                        path,
                        kind: ChangeKind::Deleted,
                    })
                    .await;
                continue;
            }

            // Latest-wins debounce: cancel any pending timer for this path
            // and arm a fresh one.
            if let Some(handle) = pending.lock().remove(&path) {
                handle.abort();
            }
            let out = out.clone();
            let pending = Arc::clone(&pending);
            let debounced_path = path.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(DEBOUNCE).await;
                pending.lock().remove(&debounced_path);
                let _ = out
                    .send(WatchedChange {
                        path: debounced_path,
                        kind,
                    })
                    .await;
            });
            pending.lock().insert(path, handle);
        }
    }
}

fn is_excluded(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| match c.as_os_str().to_str() {
            Some(name) => EXCLUDED_DIRS.contains(&name) || name.starts_with('.'),
            None => false,
        })
}
