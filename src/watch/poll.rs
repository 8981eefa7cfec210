use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::watch::FsEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    len: u64,
    modified: Option<SystemTime>,
}

type Snapshot = BTreeMap<String, Stamp>;

fn snapshot(dir: &Path) -> Result<Snapshot> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Io(format!("read_dir {} failed: {}", dir.display(), e)))?;
    let mut files = Snapshot::new();
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            // Deleted between listing and stat
            continue;
        };
        if meta.is_file() {
            files.insert(
                entry.file_name().to_string_lossy().into_owned(),
                Stamp { len: meta.len(), modified: meta.modified().ok() },
            );
        }
    }
    Ok(files)
}

/// Polling directory watcher.
///
/// Each [`poll`](Self::poll) lists the directory, compares size and mtime
/// against the previous listing and reports Create, Modify and Delete
/// events. Renames show up as a Delete plus a Create; this watcher never
/// emits Move.
pub struct DirWatcher {
    dir: PathBuf,
    previous: Snapshot,
}

impl DirWatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let previous = snapshot(&dir)?;
        Ok(Self { dir, previous })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Changes since the last poll: deletions first, then creations, then
    /// modifications, each in name order.
    pub fn poll(&mut self) -> Result<Vec<FsEvent>> {
        let current = snapshot(&self.dir)?;
        let mut events = Vec::new();

        for name in self.previous.keys() {
            if !current.contains_key(name) {
                events.push(FsEvent::delete(&self.dir, name.as_str()));
            }
        }
        for name in current.keys() {
            if !self.previous.contains_key(name) {
                events.push(FsEvent::create(&self.dir, name.as_str()));
            }
        }
        for (name, stamp) in &current {
            if let Some(old) = self.previous.get(name) {
                if old != stamp {
                    events.push(FsEvent::modify(&self.dir, name.as_str()));
                }
            }
        }

        self.previous = current;
        Ok(events)
    }

    /// Poll on a background thread every `interval`, delivering events to
    /// `callback` on that thread. Polling stops when the handle is dropped.
    pub fn spawn<F>(mut self, interval: Duration, mut callback: F) -> Result<WatchHandle>
    where
        F: FnMut(FsEvent) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let thread = std::thread::Builder::new()
            .name("script-watcher".into())
            .spawn(move || {
                debug!("watching {}", self.dir.display());
                while !stop_flag.load(Ordering::Acquire) {
                    match self.poll() {
                        Ok(events) => {
                            for event in events {
                                debug!("{:?} {}", event.kind, event.file);
                                callback(event);
                            }
                        }
                        Err(e) => warn!("watch poll failed: {}", e),
                    }
                    std::thread::park_timeout(interval);
                }
            })?;
        Ok(WatchHandle { stop, thread: Some(thread) })
    }
}

/// Stops the watcher thread when dropped.
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                warn!("watcher thread panicked");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
