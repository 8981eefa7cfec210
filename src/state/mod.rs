pub mod biome;
pub mod bitmap;
pub mod settings;

pub use biome::{Biome, BiomeId, BiomeStore, MAX_BIOMES};
pub use bitmap::{Bitmap, Rgba, pack_rgb, pack_rgba, unpack};
pub use settings::{Settings, DEFAULT_CANVAS_SIZE, FIELD_NAMES, MAX_CANVAS_SIZE};
