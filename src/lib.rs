//! Perlin Biomes
//!
//! FBM Perlin heightmaps classified into coloured biomes, with Lua hooks
//! that can rewrite the heightmap or the finished bitmap and hot reload
//! when the script changes on disk.

pub mod app;
pub mod codec;
pub mod dialog;
pub mod error;
pub mod export;
pub mod lua;
pub mod state;
pub mod watch;
pub use perlin_fbm as noise;

#[cfg(test)]
mod test_util;

pub use app::{App, AppConfig, FileAction, FrameInput, FrameReport, NullTexture, ScriptChoice, TextureSink};
pub use dialog::{DialogAction, FileDialog, FileFilter};
pub use error::{Error, Result};
pub use lua::{ScriptContext, ScriptEngine, ScriptHost};
pub use state::{Biome, BiomeId, BiomeStore, Bitmap, Rgba, Settings};
pub use watch::{DirWatcher, FsEvent, FsEventKind, ReloadCoordinator, ReloadOutcome};
