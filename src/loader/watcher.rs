/// Debounced filesystem observation for definition files
///
/// Wraps a platform watcher and exposes changes as a channel of typed
/// events consumed by the orchestrator's single reconciliation loop. Rapid
/// successive writes to one file are held until the content has been quiet
/// for a quiescence window, so a half-written file is never loaded. The
/// initial enumeration is suppressed; the orchestrator performs its own
/// startup scan.

use crate::error::WatchError;
use crate::loader::source::is_ignored_dir;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A settled filesystem change for one tracked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    /// The notification backend itself failed (e.g. watch-descriptor
    /// exhaustion); the orchestrator degrades to periodic rescans.
    Error(String),
}

/// Filesystem watcher emitting debounced [`ChangeEvent`]s.
pub struct ChangeWatcher {
    events: mpsc::Receiver<ChangeEvent>,
    /// Keeps the platform watcher alive for the lifetime of the stream
    _watcher: RecommendedWatcher,
}

impl ChangeWatcher {
    /// Watch `root` recursively for files with the given extensions.
    pub fn new(
        root: &Path,
        extensions: Vec<String>,
        quiescence: Duration,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        let watch_root = root.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for path in &event.paths {
                        // Ignore rules apply below the watch root, not to
                        // the root's own ancestors.
                        let relative = path.strip_prefix(&watch_root).unwrap_or(path);
                        if !is_tracked(relative, &extensions) {
                            continue;
                        }
                        let raw = match event.kind {
                            notify::EventKind::Create(_) => ChangeEvent::Added(path.clone()),
                            notify::EventKind::Modify(_) => ChangeEvent::Modified(path.clone()),
                            notify::EventKind::Remove(_) => ChangeEvent::Removed(path.clone()),
                            _ => continue,
                        };
                        let _ = raw_tx.send(raw);
                    }
                }
                Err(err) => {
                    let _ = raw_tx.send(ChangeEvent::Error(err.to_string()));
                }
            },
            notify::Config::default(),
        )
        .map_err(|err| WatchError {
            message: err.to_string(),
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|err| WatchError {
                message: err.to_string(),
            })?;

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(debounce_events(raw_rx, event_tx, quiescence));

        tracing::info!("👀 Watching {} for definition changes", root.display());
        Ok(Self {
            events: event_rx,
            _watcher: watcher,
        })
    }

    /// Next settled change; `None` once the watcher shuts down.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

/// Whether a path belongs to the tracked set: configured extension, no
/// ignored directory in its components, not a hidden file.
fn is_tracked(path: &Path, extensions: &[String]) -> bool {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    if !extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)) {
        return false;
    }

    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'));
    if hidden {
        return false;
    }

    // Only ancestor directories count as ignorable components; the file
    // name itself was already screened above.
    !path
        .parent()
        .map(|parent| {
            parent.components().any(|component| match component {
                std::path::Component::Normal(name) => {
                    name.to_str().is_some_and(is_ignored_dir)
                }
                _ => false,
            })
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Added,
    Modified,
}

/// Hold add/modify events per path until the path has been quiet for the
/// full window, then emit one settled event. Create-then-modify within the
/// window collapses into a single `Added`; a removal cancels any pending
/// write and passes through immediately, as do backend errors.
async fn debounce_events(
    mut raw: mpsc::UnboundedReceiver<ChangeEvent>,
    out: mpsc::Sender<ChangeEvent>,
    window: Duration,
) {
    let mut pending: HashMap<PathBuf, (PendingKind, Instant)> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|(_, deadline)| *deadline).min();
        let deadline = next_deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            event = raw.recv() => {
                match event {
                    None => break,
                    Some(ChangeEvent::Added(path)) => {
                        let deadline = Instant::now() + window;
                        pending
                            .entry(path)
                            .and_modify(|slot| slot.1 = deadline)
                            .or_insert((PendingKind::Added, deadline));
                    }
                    Some(ChangeEvent::Modified(path)) => {
                        let deadline = Instant::now() + window;
                        pending
                            .entry(path)
                            .and_modify(|slot| slot.1 = deadline)
                            .or_insert((PendingKind::Modified, deadline));
                    }
                    Some(ChangeEvent::Removed(path)) => {
                        pending.remove(&path);
                        if out.send(ChangeEvent::Removed(path)).await.is_err() {
                            return;
                        }
                    }
                    Some(error @ ChangeEvent::Error(_)) => {
                        if out.send(error).await.is_err() {
                            return;
                        }
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline), if next_deadline.is_some() => {
                let now = Instant::now();
                let settled: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, (_, deadline))| *deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();

                for path in settled {
                    let Some((kind, _)) = pending.remove(&path) else {
                        continue;
                    };
                    let event = match kind {
                        PendingKind::Added => ChangeEvent::Added(path),
                        PendingKind::Modified => ChangeEvent::Modified(path),
                    };
                    if out.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    // Watcher gone: flush whatever already settled conceptually.
    for (path, (kind, _)) in pending {
        let event = match kind {
            PendingKind::Added => ChangeEvent::Added(path),
            PendingKind::Modified => ChangeEvent::Modified(path),
        };
        if out.send(event).await.is_err() {
            return;
        }
    }
}
