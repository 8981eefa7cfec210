//! Scripts-directory change notifications.
//!
//! - `poll` - a portable polling watcher that produces `FsEvent`s
//! - `coordinator` - applies events to the `ScriptHost` (catalog + hot reload)

pub mod coordinator;
pub mod poll;

use std::path::PathBuf;

pub use coordinator::{ReloadCoordinator, ReloadOutcome};
pub use poll::{DirWatcher, WatchHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Modify,
    Delete,
    Move,
}

/// One change inside a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub dir: PathBuf,
    pub file: String,
    /// Previous name, for `Move` only
    pub old_file: Option<String>,
}

impl FsEvent {
    fn new(kind: FsEventKind, dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self { kind, dir: dir.into(), file: file.into(), old_file: None }
    }

    pub fn create(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self::new(FsEventKind::Create, dir, file)
    }

    pub fn modify(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self::new(FsEventKind::Modify, dir, file)
    }

    pub fn delete(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self::new(FsEventKind::Delete, dir, file)
    }

    pub fn moved(dir: impl Into<PathBuf>, old_file: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            old_file: Some(old_file.into()),
            ..Self::new(FsEventKind::Move, dir, file)
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}
