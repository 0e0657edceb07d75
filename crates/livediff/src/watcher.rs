//! File watcher for the two compared files
//!
//! Watches the directories holding the files, since many editors save by
//! replacing the file, and reports which of the watched files changed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, trace, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<Result<Event, notify::Error>>,
    files: Vec<PathBuf>,
}

impl FileWatcher {
    /// Create a watcher for the given files
    pub fn new(files: &[&Path]) -> anyhow::Result<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )?;

        let mut canonical = Vec::with_capacity(files.len());
        let mut dirs = BTreeSet::new();
        for file in files {
            let path = file
                .canonicalize()
                .with_context(|| format!("cannot watch {}", file.display()))?;
            if let Some(dir) = path.parent() {
                dirs.insert(dir.to_path_buf());
            }
            canonical.push(path);
        }

        for dir in &dirs {
            info!("Watching directory: {:?}", dir);
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            files: canonical,
        })
    }

    /// Drain pending events and return the positions (in the order given to
    /// [`new`](Self::new)) of the files that changed
    pub fn poll_changes(&self) -> Vec<usize> {
        let mut changed = BTreeSet::new();

        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        trace!("Ignoring access event: {:?}", event);
                        continue;
                    }

                    trace!("Received fs event: {:?}", event);
                    changed.extend(self.classify_event(&event));
                }
                Err(e) => {
                    warn!("File watcher error: {:?}", e);
                }
            }
        }

        if !changed.is_empty() {
            debug!("Changed files: {:?}", changed);
        }
        changed.into_iter().collect()
    }

    /// Positions of the watched files an event touches
    fn classify_event(&self, event: &Event) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| event.paths.iter().any(|path| same_file(path, file)))
            .map(|(position, _)| position)
            .collect()
    }
}

// Event paths are usually absolute but not always canonical
fn same_file(event_path: &Path, watched: &Path) -> bool {
    event_path == watched
        || event_path
            .canonicalize()
            .map_or(false, |path| path == watched)
}
