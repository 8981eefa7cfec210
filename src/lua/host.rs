use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::lua::runtime::{ScriptContext, ScriptEngine};
use crate::noise::HeightField;
use crate::state::Bitmap;

pub const SCRIPT_EXTENSION: &str = "lua";

/// True for file names the host treats as scripts.
pub fn is_script(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|e| e == SCRIPT_EXTENSION)
        .unwrap_or(false)
}

/// Regular `.lua` files directly inside `dir`, sorted by name.
pub fn find_scripts(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Io(format!("read_dir {} failed: {}", dir.display(), e)))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::Io(format!("read_dir entry error: {}", e)))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && is_script(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

struct HostState {
    /// Scripts available for selection
    catalog: Vec<String>,
    /// Selection survives a failed load so the next save can retry
    selected: Option<String>,
    engine: Option<ScriptEngine>,
    /// Bumped on every load attempt and unload
    generation: u64,
}

/// Owner of the active script engine.
///
/// Clones share one mutex. Hook calls, loads, reloads and unloads each hold
/// it for their whole duration, so the render thread and the watcher thread
/// only ever see a complete engine (or none).
#[derive(Clone)]
pub struct ScriptHost {
    root: PathBuf,
    state: Arc<Mutex<HostState>>,
}

/// What removing a script from the catalog did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Untracked {
    NotTracked,
    Removed,
    /// It was the selected script; the engine was dropped
    RemovedAndUnloaded,
}

impl ScriptHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Arc::new(Mutex::new(HostState {
                catalog: Vec::new(),
                selected: None,
                engine: None,
                generation: 0,
            })),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the catalog from the scripts directory.
    pub fn scan(&self) -> Result<usize> {
        let found = find_scripts(&self.root)?;
        let mut state = self.lock();
        state.catalog = found;
        debug!("found {} scripts in {}", state.catalog.len(), self.root.display());
        Ok(state.catalog.len())
    }

    pub fn scripts(&self) -> Vec<String> {
        self.lock().catalog.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().engine.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn load_locked(&self, state: &mut HostState, name: &str) -> Result<()> {
        state.engine = None;
        state.generation += 1;
        let engine = ScriptEngine::load(&self.root.join(name), name)?;
        info!("loaded script {}", name);
        state.engine = Some(engine);
        Ok(())
    }

    /// Select a script by name and load it, or unload with `None`.
    ///
    /// On a load failure the selection is kept but no engine is installed;
    /// hooks are skipped until a reload succeeds.
    pub fn select(&self, name: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        match name {
            None => {
                Self::unload_locked(&mut state);
                Ok(())
            }
            Some(name) => {
                state.selected = Some(name.to_string());
                self.load_locked(&mut state, name)
            }
        }
    }

    /// Reload the selected script from disk. Returns `Ok(false)` when
    /// nothing is selected.
    pub fn reload(&self) -> Result<bool> {
        let mut state = self.lock();
        let Some(name) = state.selected.clone() else {
            return Ok(false);
        };
        self.load_locked(&mut state, &name).map(|_| true)
    }

    fn unload_locked(state: &mut HostState) {
        if state.engine.is_some() || state.selected.is_some() {
            state.generation += 1;
        }
        if let Some(name) = state.selected.take() {
            debug!("unloaded script {}", name);
        }
        state.engine = None;
    }

    /// Drop the engine and clear the selection. Safe with nothing loaded.
    pub fn unload(&self) {
        Self::unload_locked(&mut self.lock());
    }

    /// Add a name to the catalog. Returns false if it was already there.
    pub fn track(&self, name: &str) -> bool {
        let mut state = self.lock();
        if state.catalog.iter().any(|n| n == name) {
            return false;
        }
        state.catalog.push(name.to_string());
        state.catalog.sort();
        true
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.lock().catalog.iter().any(|n| n == name)
    }

    /// Remove a name from the catalog, unloading it if it was selected.
    pub fn untrack(&self, name: &str) -> Untracked {
        let mut state = self.lock();
        let Some(idx) = state.catalog.iter().position(|n| n == name) else {
            return Untracked::NotTracked;
        };
        state.catalog.remove(idx);
        if state.selected.as_deref() == Some(name) {
            Self::unload_locked(&mut state);
            Untracked::RemovedAndUnloaded
        } else {
            Untracked::Removed
        }
    }

    /// Reload `name` if it is the selected script. `None` when it is not.
    pub fn reload_if_selected(&self, name: &str) -> Option<Result<()>> {
        let mut state = self.lock();
        if state.selected.as_deref() != Some(name) {
            return None;
        }
        Some(self.load_locked(&mut state, name))
    }

    fn with_engine(&self, f: impl FnOnce(&ScriptEngine) -> Result<()>) -> Result<()> {
        let state = self.lock();
        match state.engine.as_ref() {
            Some(engine) => f(engine),
            None => Ok(()),
        }
    }

    /// Hold the host lock across several hook calls. Reloads from other
    /// threads wait until the guard drops, so every call made through it
    /// reaches the same engine.
    pub fn hooks(&self) -> HookGuard<'_> {
        HookGuard { state: self.lock() }
    }

    pub fn call_preframe(&self, ctx: &mut ScriptContext) -> Result<()> {
        self.with_engine(|engine| engine.call_preframe(ctx))
    }

    pub fn call_heightmap(&self, field: &mut HeightField, ctx: &mut ScriptContext) -> Result<()> {
        self.hooks().call_heightmap(field, ctx)
    }

    pub fn call_frame(&self, bitmap: &mut Bitmap, ctx: &mut ScriptContext) -> Result<()> {
        self.hooks().call_frame(bitmap, ctx)
    }
}

/// Locked view of a [`ScriptHost`], see [`ScriptHost::hooks`].
pub struct HookGuard<'a> {
    state: MutexGuard<'a, HostState>,
}

impl HookGuard<'_> {
    /// Generation of the engine every call through this guard uses.
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn call_heightmap(&self, field: &mut HeightField, ctx: &mut ScriptContext) -> Result<()> {
        match self.state.engine.as_ref() {
            Some(engine) => engine.call_heightmap(field, ctx),
            None => Ok(()),
        }
    }

    pub fn call_frame(&self, bitmap: &mut Bitmap, ctx: &mut ScriptContext) -> Result<()> {
        match self.state.engine.as_ref() {
            Some(engine) => engine.call_frame(bitmap, ctx),
            None => Ok(()),
        }
    }
}
