//! File formats: settings and biome JSON.

pub mod json;

pub use json::{
    biomes_from_json, biomes_to_json, read_biomes, read_settings, settings_from_json,
    settings_to_json, write_biomes, write_settings, BiomeRule,
};
