use crate::error::{Error, Result};
use crate::noise::FbmParams;

pub const DEFAULT_CANVAS_SIZE: u32 = 512;

/// Largest accepted canvas side. Keeps the bitmap and height field
/// allocations bounded whatever a settings file or script asks for.
pub const MAX_CANVAS_SIZE: u32 = 4096;

/// Noise and canvas parameters.
///
/// Committed and proposed copies are compared field by field once per
/// frame; any difference means the canvas is regenerated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub z_offset: f32,
    pub scale: f32,
    pub lacunarity: f32,
    pub gain: f32,
    pub octaves: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_SIZE,
            canvas_height: DEFAULT_CANVAS_SIZE,
            x_offset: 0.0,
            y_offset: 0.0,
            z_offset: 0.0,
            scale: 200.0,
            lacunarity: 2.0,
            gain: 0.5,
            octaves: 8,
        }
    }
}

/// Names scripts use with `Setting(name[, value])`, in declaration order.
pub const FIELD_NAMES: [&str; 9] = [
    "canvasWidth",
    "canvasHeight",
    "xoff",
    "yoff",
    "zoff",
    "scale",
    "lacunarity",
    "gain",
    "octaves",
];

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::InvalidSettings(format!(
                "canvas must be at least 1x1, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.canvas_width > MAX_CANVAS_SIZE || self.canvas_height > MAX_CANVAS_SIZE {
            return Err(Error::InvalidSettings(format!(
                "canvas must be at most {}x{}, got {}x{}",
                MAX_CANVAS_SIZE, MAX_CANVAS_SIZE, self.canvas_width, self.canvas_height
            )));
        }
        if self.octaves == 0 {
            return Err(Error::InvalidSettings("octaves must be at least 1".into()));
        }
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(Error::InvalidSettings(format!("scale must be non-zero, got {}", self.scale)));
        }
        Ok(())
    }

    /// Read a field by its script name. Integers come back as floats.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "canvasWidth" => self.canvas_width as f64,
            "canvasHeight" => self.canvas_height as f64,
            "xoff" => self.x_offset as f64,
            "yoff" => self.y_offset as f64,
            "zoff" => self.z_offset as f64,
            "scale" => self.scale as f64,
            "lacunarity" => self.lacunarity as f64,
            "gain" => self.gain as f64,
            "octaves" => self.octaves as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Write a field by its script name. Integer fields truncate toward zero
    /// and saturate at 0. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match name {
            "canvasWidth" => self.canvas_width = value as u32,
            "canvasHeight" => self.canvas_height = value as u32,
            "xoff" => self.x_offset = value as f32,
            "yoff" => self.y_offset = value as f32,
            "zoff" => self.z_offset = value as f32,
            "scale" => self.scale = value as f32,
            "lacunarity" => self.lacunarity = value as f32,
            "gain" => self.gain = value as f32,
            "octaves" => self.octaves = value as u32,
            _ => return false,
        }
        true
    }

    pub fn same_canvas(&self, other: &Settings) -> bool {
        self.canvas_width == other.canvas_width && self.canvas_height == other.canvas_height
    }

    pub fn fbm_params(&self, falloff: Option<f32>) -> FbmParams {
        FbmParams {
            width: self.canvas_width,
            height: self.canvas_height,
            z: self.z_offset,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            scale: self.scale,
            lacunarity: self.lacunarity,
            gain: self.gain,
            octaves: self.octaves,
            falloff,
        }
    }
}
