use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::error::{Error, Result};
use crate::state::{BiomeStore, Rgba, Settings, MAX_BIOMES};

/// Colour and upper threshold of one imported biome.
pub type BiomeRule = (Rgba, f32);

/// `{"perlin": {...}}`. Every member is a float on disk, including the
/// integer ones.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    perlin: PerlinSection,
}

#[derive(Debug, Serialize, Deserialize)]
struct PerlinSection {
    #[serde(rename = "canvasWidth")]
    canvas_width: f64,
    #[serde(rename = "canvasHeight")]
    canvas_height: f64,
    xoff: f64,
    yoff: f64,
    zoff: f64,
    scale: f64,
    lacunarity: f64,
    gain: f64,
    octaves: f64,
}

#[derive(Debug, Deserialize)]
struct BiomesFile {
    biomes: Vec<BiomeEntry>,
}

#[derive(Debug, Deserialize)]
struct BiomeEntry {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
    max: f64,
}

fn malformed(what: &'static str) -> impl Fn(serde_json::Error) -> Error {
    move |e| Error::Serialization { what, message: e.to_string() }
}

pub fn settings_to_json(settings: &Settings) -> Result<String> {
    let file = SettingsFile {
        perlin: PerlinSection {
            canvas_width: settings.canvas_width as f64,
            canvas_height: settings.canvas_height as f64,
            xoff: settings.x_offset as f64,
            yoff: settings.y_offset as f64,
            zoff: settings.z_offset as f64,
            scale: settings.scale as f64,
            lacunarity: settings.lacunarity as f64,
            gain: settings.gain as f64,
            octaves: settings.octaves as f64,
        },
    };
    serde_json::to_string_pretty(&file).map_err(malformed("settings"))
}

/// Parse a settings file. Width, height and octaves are truncated toward
/// zero. The result is validated, so a successful parse is always usable.
pub fn settings_from_json(text: &str) -> Result<Settings> {
    let file: SettingsFile = serde_json::from_str(text).map_err(malformed("settings"))?;
    let p = file.perlin;
    let settings = Settings {
        canvas_width: p.canvas_width as u32,
        canvas_height: p.canvas_height as u32,
        x_offset: p.xoff as f32,
        y_offset: p.yoff as f32,
        z_offset: p.zoff as f32,
        scale: p.scale as f32,
        lacunarity: p.lacunarity as f32,
        gain: p.gain as f32,
        octaves: p.octaves as u32,
    };
    settings.validate()?;
    Ok(settings)
}

/// `{"biomes": [{"r", "g", "b", "a", "max"}]}` in classification order.
/// Colour channels are written as truncated 0..255 integers.
pub fn biomes_to_json(store: &BiomeStore) -> Result<String> {
    let biomes: Vec<_> = store
        .iter()
        .map(|biome| {
            let [r, g, b, a] = biome.color.to_bytes();
            json!({ "r": r, "g": g, "b": b, "a": a, "max": biome.threshold })
        })
        .collect();
    serde_json::to_string_pretty(&json!({ "biomes": biomes })).map_err(malformed("biomes"))
}

/// Parse a biomes file into rules ready for [`BiomeStore::replace_all`].
/// Entries past [`MAX_BIOMES`] are dropped with a warning.
pub fn biomes_from_json(text: &str) -> Result<Vec<BiomeRule>> {
    let file: BiomesFile = serde_json::from_str(text).map_err(malformed("biomes"))?;
    if file.biomes.len() > MAX_BIOMES {
        warn!("biomes file has {} entries, keeping the first {}", file.biomes.len(), MAX_BIOMES);
    }
    let channel = |v: f64| (v.clamp(0.0, 255.0) / 255.0) as f32;
    Ok(file
        .biomes
        .into_iter()
        .take(MAX_BIOMES)
        .map(|e| (Rgba::new(channel(e.r), channel(e.g), channel(e.b), channel(e.a)), e.max as f32))
        .collect())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Io(format!("failed to read {}: {}", path.display(), e)))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| Error::Io(format!("failed to write {}: {}", path.display(), e)))
}

pub fn read_settings(path: &Path) -> Result<Settings> {
    settings_from_json(&read_text(path)?)
}

pub fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    write_text(path, &settings_to_json(settings)?)
}

pub fn read_biomes(path: &Path) -> Result<Vec<BiomeRule>> {
    biomes_from_json(&read_text(path)?)
}

pub fn write_biomes(path: &Path, store: &BiomeStore) -> Result<()> {
    write_text(path, &biomes_to_json(store)?)
}
