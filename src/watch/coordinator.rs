use std::sync::mpsc::Sender;

use tracing::{debug, error, info};

use crate::lua::{is_script, ScriptHost, Untracked};
use crate::watch::{FsEvent, FsEventKind};

/// What one filesystem event did to the script host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Ignored,
    /// New script appended to the catalog
    Added(String),
    /// Selected script reloaded from disk
    Reloaded(String),
    /// Selected script failed to reload; no engine is active until it loads
    ReloadFailed { script: String, message: String },
    /// Script dropped from the catalog
    Removed(String),
    /// Selected script dropped from the catalog and unloaded
    Unloaded(String),
}

/// Applies scripts-directory events to a [`ScriptHost`].
///
/// Existence is re-checked on disk for every event because watchers can
/// deliver stale notifications: a Create or Modify whose file is gone is
/// handled as a Delete, and a Delete whose file exists again is dropped.
#[derive(Clone)]
pub struct ReloadCoordinator {
    host: ScriptHost,
    /// Receives the message of every failed reload run through the callback
    notices: Option<Sender<String>>,
}

impl ReloadCoordinator {
    pub fn new(host: ScriptHost) -> Self {
        Self { host, notices: None }
    }

    pub fn with_notices(mut self, notices: Sender<String>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    /// A `Move` produces two outcomes (old name, then new name); every
    /// other kind produces one.
    pub fn handle(&self, event: &FsEvent) -> Vec<ReloadOutcome> {
        match event.kind {
            FsEventKind::Create => vec![self.on_create(event)],
            FsEventKind::Modify => vec![self.on_modify(event)],
            FsEventKind::Delete => vec![self.on_delete(event, &event.file)],
            FsEventKind::Move => {
                let mut outcomes = Vec::with_capacity(2);
                if let Some(old) = &event.old_file {
                    outcomes.push(self.on_delete(event, old));
                }
                outcomes.push(self.on_create(event));
                outcomes
            }
        }
    }

    /// Callback suitable for [`DirWatcher::spawn`](crate::watch::DirWatcher::spawn).
    /// Failed reloads are forwarded to the notice channel, if any.
    pub fn into_callback(self) -> impl FnMut(FsEvent) + Send + 'static {
        move |event| {
            for outcome in self.handle(&event) {
                if let (ReloadOutcome::ReloadFailed { message, .. }, Some(tx)) = (outcome, &self.notices) {
                    // Receiver gone means nobody is showing notices any more
                    let _ = tx.send(message);
                }
            }
        }
    }

    fn exists(event: &FsEvent, name: &str) -> bool {
        event.dir.join(name).is_file()
    }

    fn on_create(&self, event: &FsEvent) -> ReloadOutcome {
        let name = event.file.as_str();
        if !is_script(name) {
            return ReloadOutcome::Ignored;
        }
        if !Self::exists(event, name) {
            debug!("{} created but already gone", name);
            return self.on_delete(event, name);
        }
        if self.host.is_tracked(name) {
            // Editors that save by replace report a Create for a known file
            return self.on_modify(event);
        }
        self.host.track(name);
        info!("new script {}", name);
        ReloadOutcome::Added(name.to_string())
    }

    fn on_modify(&self, event: &FsEvent) -> ReloadOutcome {
        let name = event.file.as_str();
        if !is_script(name) {
            return ReloadOutcome::Ignored;
        }
        if !Self::exists(event, name) {
            debug!("{} modified but already gone", name);
            return self.on_delete(event, name);
        }
        match self.host.reload_if_selected(name) {
            None => ReloadOutcome::Ignored,
            Some(Ok(())) => {
                info!("reloaded {}", name);
                ReloadOutcome::Reloaded(name.to_string())
            }
            Some(Err(e)) => {
                error!("reload of {} failed: {}", name, e);
                ReloadOutcome::ReloadFailed {
                    script: name.to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn on_delete(&self, event: &FsEvent, name: &str) -> ReloadOutcome {
        if !is_script(name) {
            return ReloadOutcome::Ignored;
        }
        if Self::exists(event, name) {
            debug!("{} deleted but exists again", name);
            return ReloadOutcome::Ignored;
        }
        match self.host.untrack(name) {
            Untracked::NotTracked => ReloadOutcome::Ignored,
            Untracked::Removed => {
                info!("script {} removed", name);
                ReloadOutcome::Removed(name.to_string())
            }
            Untracked::RemovedAndUnloaded => {
                info!("active script {} removed, unloaded", name);
                ReloadOutcome::Unloaded(name.to_string())
            }
        }
    }
}
