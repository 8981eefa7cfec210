//! Per-frame orchestration.
//!
//! [`App`] owns everything the render thread touches: committed and
//! proposed settings, the biome store, the canvas bitmap and a handle to the
//! shared [`ScriptHost`]. A front end edits [`App::proposed_mut`] from its UI,
//! then calls [`App::frame`] once per displayed frame. The expensive noise
//! pass only runs when something that affects the picture changed.
//!
//! A redraw holds the host lock from the `heightmap` hook through the
//! `frame` hook, so a hot reload lands either before or after the whole
//! pass, never between the two hooks.

pub mod config;
pub mod files;
pub mod texture;

use std::sync::mpsc::{self, Receiver};

use tracing::debug;

use crate::error::{fail, Error, Result};
use crate::lua::{ScriptContext, ScriptHost};
use crate::noise::fbm;
use crate::state::{BiomeId, BiomeStore, Bitmap, Rgba, Settings};
use crate::watch::{DirWatcher, ReloadCoordinator, WatchHandle};

pub use config::{data_dir, AppConfig, DEFAULT_SCRIPTS_DIR, DEFAULT_WATCH_INTERVAL};
pub use files::FileAction;
pub use texture::{NullTexture, TextureSink};

/// Oldest notices are dropped past this many.
pub const MAX_NOTICES: usize = 64;

/// Script picker choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptChoice {
    None,
    Named(String),
}

/// UI actions for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Frame time scaled so 1.0 is one frame at 60 Hz
    pub delta: f32,
    /// "Reset" pressed
    pub reset: bool,
    /// Script picker changed
    pub select_script: Option<ScriptChoice>,
}

impl FrameInput {
    pub fn new(delta: f32) -> Self {
        Self { delta, ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub regenerated: bool,
    pub resized: bool,
    /// Proposed settings were invalid and reverted
    pub settings_rejected: bool,
}

pub struct App {
    config: AppConfig,
    committed: Settings,
    proposed: Settings,
    biomes: BiomeStore,
    biome_mode: bool,
    bitmap: Bitmap,
    host: ScriptHost,
    /// Host generation the canvas was last drawn with
    drawn_generation: u64,
    /// Biome state changed, or nothing drawn yet
    dirty: bool,
    /// Texture not created yet
    needs_texture: bool,
    delta: f32,
    regenerations: u64,
    notices: Vec<String>,
    /// Failed reloads reported by the watcher thread
    watch_notices: Option<Receiver<String>>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let committed = Settings::default();
        let host = ScriptHost::new(&config.scripts_dir);
        let mut app = Self {
            biome_mode: config.biome_mode,
            bitmap: Bitmap::new(committed.canvas_width, committed.canvas_height),
            drawn_generation: host.generation(),
            host,
            config,
            committed,
            proposed: committed,
            biomes: BiomeStore::new(),
            dirty: true,
            needs_texture: true,
            delta: 0.0,
            regenerations: 0,
            notices: Vec::new(),
            watch_notices: None,
        };
        if let Err(e) = app.host.scan() {
            app.report(e);
        }
        app
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn committed(&self) -> &Settings {
        &self.committed
    }

    pub fn proposed(&self) -> &Settings {
        &self.proposed
    }

    /// Settings the UI edits; picked up by the next [`frame`](Self::frame).
    pub fn proposed_mut(&mut self) -> &mut Settings {
        &mut self.proposed
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    /// Number of noise passes run so far.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Messages for the user, oldest first. At most [`MAX_NOTICES`] are
    /// kept and a message equal to the newest one is not repeated.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn push_notice(&mut self, message: String) {
        if self.notices.last() == Some(&message) {
            return;
        }
        if self.notices.len() >= MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(message);
    }

    fn drain_watch_notices(&mut self) {
        let Some(rx) = &self.watch_notices else {
            return;
        };
        let messages: Vec<String> = rx.try_iter().collect();
        for message in messages {
            self.push_notice(message);
        }
    }

    fn report(&mut self, err: Error) {
        let _ = self.noted::<()>(Err(err));
    }

    /// Pass `result` through, logging and recording a notice on failure.
    fn noted<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            fail(&e, false);
            self.push_notice(e.to_string());
            e
        })
    }

    pub fn frame(&mut self, input: FrameInput, sink: &mut dyn TextureSink) -> FrameReport {
        let mut report = FrameReport::default();
        self.delta = input.delta;
        self.drain_watch_notices();

        let mut ctx = ScriptContext::new(self.proposed, self.delta);
        if let Err(e) = self.host.call_preframe(&mut ctx) {
            self.report(e);
        }
        self.proposed = ctx.settings;

        if input.reset {
            debug!("settings reset to defaults");
            self.proposed = Settings::default();
        }

        if let Some(choice) = input.select_script {
            self.select_script(choice);
        }

        if let Err(e) = self.proposed.validate() {
            self.report(e);
            self.proposed = self.committed;
            report.settings_rejected = true;
        }

        if self.needs_texture || !self.proposed.same_canvas(&self.committed) {
            let (w, h) = (self.proposed.canvas_width, self.proposed.canvas_height);
            self.bitmap.resize(w, h);
            sink.recreate(w, h);
            self.needs_texture = false;
            report.resized = true;
        }

        if self.dirty || self.proposed != self.committed || self.host.generation() != self.drawn_generation {
            self.regenerate(sink);
            report.regenerated = true;
        }
        report
    }

    fn regenerate(&mut self, sink: &mut dyn TextureSink) {
        self.committed = self.proposed;
        self.dirty = false;
        self.regenerations += 1;
        debug!(
            "regenerating {}x{} (octaves {}, z {})",
            self.committed.canvas_width, self.committed.canvas_height, self.committed.octaves, self.committed.z_offset
        );

        let mut field = fbm(&self.committed.fbm_params(self.config.island_falloff));

        // Hooks write into proposed; changes show up on the next frame
        let mut ctx = ScriptContext::new(self.proposed, self.delta);
        let mut errors = Vec::new();
        let hooks = self.host.hooks();
        self.drawn_generation = hooks.generation();
        if let Err(e) = hooks.call_heightmap(&mut field, &mut ctx) {
            errors.push(e);
        }

        for (pixel, &height) in self.bitmap.pixels_mut().iter_mut().zip(field.as_slice()) {
            *pixel = self.biomes.classify_or_gray(height, self.biome_mode);
        }

        if let Err(e) = hooks.call_frame(&mut self.bitmap, &mut ctx) {
            errors.push(e);
        }
        drop(hooks);
        for e in errors {
            self.report(e);
        }
        self.proposed = ctx.settings;

        sink.upload(&self.bitmap);
    }

    /// Force a redraw on the next frame.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    // Scripts

    pub fn scripts(&self) -> Vec<String> {
        self.host.scripts()
    }

    pub fn rescan_scripts(&mut self) -> usize {
        match self.host.scan() {
            Ok(n) => n,
            Err(e) => {
                self.report(e);
                0
            }
        }
    }

    /// Load a script (or none). The canvas redraws on the next frame either
    /// way since the host generation moves.
    pub fn select_script(&mut self, choice: ScriptChoice) {
        let result = match &choice {
            ScriptChoice::None => self.host.select(None),
            ScriptChoice::Named(name) => self.host.select(Some(name.as_str())),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    /// A coordinator for this app's host whose failed reloads show up as
    /// notices on the next [`frame`](Self::frame). Only the most recently
    /// created coordinator is listened to.
    pub fn reload_coordinator(&mut self) -> ReloadCoordinator {
        let (tx, rx) = mpsc::channel();
        self.watch_notices = Some(rx);
        ReloadCoordinator::new(self.host.clone()).with_notices(tx)
    }

    /// Watch the scripts directory on a background thread; dropping the
    /// handle stops it.
    pub fn watch_scripts(&mut self) -> Result<WatchHandle> {
        let watcher = DirWatcher::new(&self.config.scripts_dir);
        let watcher = self.noted(watcher)?;
        let callback = self.reload_coordinator().into_callback();
        let handle = watcher.spawn(self.config.watch_interval, callback);
        self.noted(handle)
    }

    // Biomes

    pub fn biomes(&self) -> &BiomeStore {
        &self.biomes
    }

    pub fn biome_mode(&self) -> bool {
        self.biome_mode
    }

    pub fn set_biome_mode(&mut self, enabled: bool) {
        if self.biome_mode != enabled {
            self.biome_mode = enabled;
            self.dirty = true;
        }
    }

    pub fn add_biome(&mut self, color: Rgba, threshold: f32) -> Option<BiomeId> {
        let id = self.biomes.add(color, threshold);
        match id {
            Some(_) => self.dirty = true,
            None => self.push_notice(format!("biome limit of {} reached", crate::state::MAX_BIOMES)),
        }
        id
    }

    pub fn add_default_biome(&mut self) -> Option<BiomeId> {
        self.add_biome(Rgba::WHITE, 1.0)
    }

    pub fn remove_biome(&mut self, id: BiomeId) -> bool {
        let removed = self.biomes.remove(id);
        self.dirty |= removed;
        removed
    }

    pub fn edit_biome(&mut self, id: BiomeId, color: Option<Rgba>, threshold: Option<f32>) -> bool {
        let edited = self.biomes.edit(id, color, threshold);
        self.dirty |= edited;
        edited
    }

    pub fn clear_biomes(&mut self) {
        if !self.biomes.is_empty() {
            self.biomes.clear();
            self.dirty = true;
        }
    }

    /// Replace the biome store with the rules in `path`. On failure nothing
    /// changes.
    pub fn import_biomes(&mut self, path: &std::path::Path) -> Result<usize> {
        let rules = crate::codec::read_biomes(path);
        let rules = self.noted(rules)?;
        let count = self.biomes.replace_all(rules);
        self.dirty = true;
        debug!("imported {} biomes from {}", count, path.display());
        Ok(count)
    }

    /// Load settings from `path` into the proposed copy. On failure nothing
    /// changes.
    pub fn import_settings(&mut self, path: &std::path::Path) -> Result<()> {
        let settings = crate::codec::read_settings(path);
        self.proposed = self.noted(settings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::pack_rgb;
    use crate::test_util::scratch_dir;
    use std::path::Path;

    #[derive(Default)]
    struct CountingSink {
        recreated: Vec<(u32, u32)>,
        uploads: usize,
        last_pixel: Option<u32>,
    }

    impl TextureSink for CountingSink {
        fn recreate(&mut self, width: u32, height: u32) {
            self.recreated.push((width, height));
        }

        fn upload(&mut self, bitmap: &Bitmap) {
            self.uploads += 1;
            self.last_pixel = bitmap.get(0, 0);
        }
    }

    fn small() -> Settings {
        Settings { canvas_width: 16, canvas_height: 8, octaves: 2, ..Default::default() }
    }

    fn new_app(tag: &str) -> (std::path::PathBuf, App) {
        let dir = scratch_dir(tag);
        let config = AppConfig { scripts_dir: dir.clone(), data_dir: dir.clone(), ..Default::default() };
        let mut app = App::new(config);
        *app.proposed_mut() = small();
        (dir, app)
    }

    fn write(dir: &Path, name: &str, src: &str) {
        std::fs::write(dir.join(name), src).unwrap();
    }

    #[test]
    fn test_identical_frames_regenerate_once() {
        let (_dir, mut app) = new_app("app-gate");
        let mut sink = CountingSink::default();
        let first = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(first.regenerated && first.resized);
        let second = app.frame(FrameInput::new(1.0), &mut sink);
        assert_eq!(second, FrameReport::default());
        assert_eq!(app.regenerations(), 1);
        assert_eq!(sink.uploads, 1);
        assert_eq!(sink.recreated, vec![(16, 8)]);
        assert_eq!(app.bitmap().width(), 16);
    }

    #[test]
    fn test_setting_change_regenerates() {
        let (_dir, mut app) = new_app("app-change");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        app.proposed_mut().z_offset = 0.5;
        let report = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(report.regenerated);
        assert!(!report.resized);
        assert_eq!(app.committed().z_offset, 0.5);
        assert_eq!(app.regenerations(), 2);
    }

    #[test]
    fn test_resize_recreates_texture() {
        let (_dir, mut app) = new_app("app-resize");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        app.proposed_mut().canvas_width = 32;
        let report = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(report.resized && report.regenerated);
        assert_eq!(sink.recreated, vec![(16, 8), (32, 8)]);
        assert_eq!(app.bitmap().pixels().len(), 32 * 8);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (_dir, mut app) = new_app("app-invalid");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        app.proposed_mut().octaves = 0;
        let report = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(report.settings_rejected);
        assert!(!report.regenerated);
        assert_eq!(app.proposed(), &small());
        assert_eq!(app.notices().len(), 1);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (_dir, mut app) = new_app("app-reset");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        let report = app.frame(FrameInput { reset: true, ..FrameInput::new(1.0) }, &mut sink);
        assert!(report.resized && report.regenerated);
        assert_eq!(app.committed(), &Settings::default());
    }

    #[test]
    fn test_biome_edits_mark_dirty() {
        let (_dir, mut app) = new_app("app-biomes");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);

        let id = app.add_biome(Rgba::new(1.0, 0.0, 0.0, 1.0), 1.0).unwrap();
        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        // Every height is at most 1.0, so everything is red
        assert!(app.bitmap().pixels().iter().all(|&p| p == pack_rgb(255, 0, 0)));

        app.set_biome_mode(false);
        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        let [r, g, b, _] = crate::state::unpack(app.bitmap().pixels()[0]);
        assert!(r == g && g == b);

        app.set_biome_mode(false);
        assert!(!app.frame(FrameInput::new(1.0), &mut sink).regenerated);

        assert!(app.edit_biome(id, None, Some(0.5)));
        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        assert!(!app.remove_biome(id + 100));
        assert!(!app.frame(FrameInput::new(1.0), &mut sink).regenerated);
    }

    #[test]
    fn test_biome_limit_notice() {
        let (_dir, mut app) = new_app("app-limit");
        for _ in 0..crate::state::MAX_BIOMES {
            assert!(app.add_default_biome().is_some());
        }
        assert!(app.add_default_biome().is_none());
        assert_eq!(app.biomes().len(), crate::state::MAX_BIOMES);
        assert_eq!(app.notices().len(), 1);
    }

    #[test]
    fn test_script_selection_regenerates_with_hooks() {
        let (dir, mut app) = new_app("app-script");
        write(&dir, "paint.lua", "function frame(b) b:pset(0, 0, RGB(1, 2, 3)) end");
        assert_eq!(app.rescan_scripts(), 1);
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);

        let input = FrameInput { select_script: Some(ScriptChoice::Named("paint.lua".into())), ..FrameInput::new(1.0) };
        assert!(app.frame(input, &mut sink).regenerated);
        assert_eq!(sink.last_pixel, Some(pack_rgb(1, 2, 3)));

        let input = FrameInput { select_script: Some(ScriptChoice::None), ..FrameInput::new(1.0) };
        assert!(app.frame(input, &mut sink).regenerated);
        assert_ne!(sink.last_pixel, Some(pack_rgb(1, 2, 3)));
        assert!(!app.frame(FrameInput::new(1.0), &mut sink).regenerated);
    }

    #[test]
    fn test_preframe_animation_regenerates_each_frame() {
        let (dir, mut app) = new_app("app-anim");
        write(&dir, "anim.lua", "function preframe() Setting('zoff', Setting('zoff') + Delta()) end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("anim.lua".into()));
        let mut sink = CountingSink::default();
        for _ in 0..3 {
            assert!(app.frame(FrameInput::new(0.5), &mut sink).regenerated);
        }
        assert_eq!(app.committed().z_offset, 1.5);
    }

    #[test]
    fn test_reload_from_other_thread_regenerates() {
        let (dir, mut app) = new_app("app-reload");
        write(&dir, "s.lua", "function frame(b) b:pset(0, 0, RGB(9, 9, 9)) end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("s.lua".into()));
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        assert!(!app.frame(FrameInput::new(1.0), &mut sink).regenerated);

        write(&dir, "s.lua", "function frame(b) b:pset(0, 0, RGB(7, 7, 7)) end");
        let host = app.host().clone();
        std::thread::spawn(move || host.reload().unwrap()).join().unwrap();

        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        assert_eq!(sink.last_pixel, Some(pack_rgb(7, 7, 7)));
    }

    #[test]
    fn test_script_errors_become_notices() {
        let (dir, mut app) = new_app("app-errors");
        write(&dir, "bad.lua", "function frame(b) error('nope') end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("bad.lua".into()));
        app.select_script(ScriptChoice::Named("missing.lua".into()));
        assert_eq!(app.take_notices().len(), 1);
        app.select_script(ScriptChoice::Named("bad.lua".into()));
        app.frame(FrameInput::new(1.0), &mut NullTexture);
        let notices = app.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("nope"), "{:?}", notices);
    }

    #[test]
    fn test_heightmap_hook_runs_before_classification() {
        let (dir, mut app) = new_app("app-heightmap");
        write(&dir, "flat.lua", "function heightmap(h, x, y, w, hh) return 0 end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("flat.lua".into()));
        app.add_biome(Rgba::new(0.0, 0.0, 1.0, 1.0), 0.1);
        app.add_biome(Rgba::new(0.0, 1.0, 0.0, 1.0), 1.0);
        app.frame(FrameInput::new(1.0), &mut NullTexture);
        assert!(app.bitmap().pixels().iter().all(|&p| p == pack_rgb(0, 0, 255)));
    }

    #[test]
    fn test_failed_import_leaves_state() {
        let (dir, mut app) = new_app("app-import");
        app.add_default_biome();
        write(&dir, "broken.json", "{\"biomes\": [{\"r\": 1}]}");
        assert!(app.import_biomes(&dir.join("broken.json")).is_err());
        assert_eq!(app.biomes().len(), 1);
        assert!(app.import_settings(&dir.join("missing.json")).is_err());
        assert_eq!(app.proposed(), &small());
        assert_eq!(app.notices().len(), 2);

        write(&dir, "ok.json", r#"{"biomes": [{"r": 0, "g": 0, "b": 255, "a": 255, "max": 0.4}]}"#);
        assert_eq!(app.import_biomes(&dir.join("ok.json")).unwrap(), 1);
        assert_eq!(app.biomes().iter().next().map(|b| b.threshold), Some(0.4));
    }

    #[test]
    fn test_hook_setting_writes_reach_next_frame() {
        let (dir, mut app) = new_app("app-hookset");
        write(&dir, "bump.lua", "function frame(b) if Setting('xoff') < 1 then Setting('xoff', 1) end end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("bump.lua".into()));
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        assert_eq!(app.proposed().x_offset, 1.0);
        assert_eq!(app.committed().x_offset, 0.0);
        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        assert!(!app.frame(FrameInput::new(1.0), &mut sink).regenerated);
    }

    #[test]
    fn test_oversized_settings_rejected() {
        let (dir, mut app) = new_app("app-oversized");
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);

        app.proposed_mut().canvas_width = u32::MAX;
        let report = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(report.settings_rejected && !report.resized);
        assert_eq!(app.bitmap().width(), 16);

        write(&dir, "grow.lua", "function preframe() Setting('canvasWidth', 4294967295) end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("grow.lua".into()));
        let report = app.frame(FrameInput::new(1.0), &mut sink);
        assert!(report.settings_rejected);
        assert_eq!(app.committed().canvas_width, 16);
        assert!(app.take_notices().iter().all(|n| n.contains("at most")));
    }

    #[test]
    fn test_watcher_reload_failure_becomes_notice() {
        let (dir, mut app) = new_app("app-watch-fail");
        write(&dir, "s.lua", "function frame(b) end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("s.lua".into()));
        let mut sink = CountingSink::default();
        app.frame(FrameInput::new(1.0), &mut sink);
        assert!(app.notices().is_empty());

        write(&dir, "s.lua", "function (");
        let mut callback = app.reload_coordinator().into_callback();
        let event = crate::watch::FsEvent::modify(&dir, "s.lua");
        std::thread::spawn(move || callback(event)).join().unwrap();

        assert!(app.frame(FrameInput::new(1.0), &mut sink).regenerated);
        assert!(!app.host().is_loaded());
        let notices = app.take_notices();
        assert_eq!(notices.len(), 1, "{:?}", notices);
        assert!(notices[0].contains("s.lua"), "{:?}", notices);
    }

    #[test]
    fn test_repeated_preframe_error_noted_once() {
        let (dir, mut app) = new_app("app-repeat");
        write(&dir, "loop.lua", "function preframe() error('again') end");
        app.rescan_scripts();
        app.select_script(ScriptChoice::Named("loop.lua".into()));
        for _ in 0..10 {
            app.frame(FrameInput::new(1.0), &mut NullTexture);
        }
        assert_eq!(app.notices().len(), 1);
    }

    #[test]
    fn test_notices_capped() {
        let (dir, mut app) = new_app("app-cap");
        for i in 0..MAX_NOTICES + 5 {
            let _ = app.import_settings(&dir.join(format!("missing-{}.json", i)));
        }
        let notices = app.notices();
        assert_eq!(notices.len(), MAX_NOTICES);
        assert!(notices[0].contains("missing-5.json"), "{}", notices[0]);
        assert!(notices[MAX_NOTICES - 1].contains(&format!("missing-{}.json", MAX_NOTICES + 4)));
    }
}
