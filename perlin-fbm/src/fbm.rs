//! Fractal Brownian motion over [`perlin3`], normalized to an 8-bit field.

use crate::field::HeightField;
use crate::perlin::perlin3;

/// Parameters for one [`fbm`] evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FbmParams {
    pub width: u32,
    pub height: u32,
    /// Z slice through the 3D noise volume
    pub z: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub scale: f32,
    /// Frequency multiplier per octave
    pub lacunarity: f32,
    /// Amplitude multiplier per octave
    pub gain: f32,
    pub octaves: u32,
    /// Island edge fade strength; `None` disables it
    pub falloff: Option<f32>,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            z: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            scale: 200.0,
            lacunarity: 2.0,
            gain: 0.5,
            octaves: 8,
            falloff: None,
        }
    }
}

/// Octave sum at one canvas position, divided by the total amplitude.
fn sample(params: &FbmParams, x: f32, y: f32) -> f32 {
    let mut freq = 2.0f32;
    let mut amp = 1.0f32;
    let mut total = 0.0f32;
    let mut sum = 0.0f32;

    let sx = (params.x_offset + x) / params.scale;
    let sy = (params.y_offset + y) / params.scale;
    for _ in 0..params.octaves {
        sum += perlin3(sx * freq, sy * freq, params.z) * amp;
        total += amp;
        freq *= params.lacunarity;
        amp *= params.gain;
    }

    if total == 0.0 {
        0.0
    } else {
        sum / total
    }
}

/// Distance from the canvas centre: 0 at the centre, 1 at the corners.
fn radial_distance(x: u32, y: u32, width: u32, height: u32) -> f32 {
    let nx = if width > 1 { 2.0 * x as f32 / (width - 1) as f32 - 1.0 } else { 0.0 };
    let ny = if height > 1 { 2.0 * y as f32 / (height - 1) as f32 - 1.0 } else { 0.0 };
    ((nx * nx + ny * ny) / 2.0).sqrt()
}

/// Generate a height field.
///
/// Each pixel sums `octaves` Perlin samples (frequency from 2.0, times
/// `lacunarity`; amplitude from 1.0, times `gain`). The whole field is then
/// remapped from its own [min, max] onto [0, 255] and inverted, so the
/// strongest noise becomes the *lowest* height. A flat field remaps to 255
/// everywhere.
///
/// Runs in O(width * height * octaves).
pub fn fbm(params: &FbmParams) -> HeightField {
    let (w, h) = (params.width, params.height);
    let mut grid = vec![0.0f32; w as usize * h as usize];
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;

    for y in 0..h {
        for x in 0..w {
            let v = sample(params, x as f32, y as f32);
            grid[y as usize * w as usize + x as usize] = v;
            min = min.min(v);
            max = max.max(v);
        }
    }

    let span = max - min;
    let mut field = HeightField::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let idx = field.index(x, y);
            let remapped = if span > 0.0 { (grid[idx] - min) / span } else { 0.0 };
            let mut height = 255.0 - 255.0 * remapped;
            if let Some(strength) = params.falloff {
                height -= 255.0 * strength * radial_distance(x, y, w, h);
            }
            // NaN (from a degenerate scale) saturates to 0 in the cast
            field.as_mut_slice()[idx] = height.clamp(0.0, 255.0) as u8;
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FbmParams {
        FbmParams {
            width: 48,
            height: 32,
            scale: 20.0,
            octaves: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_spans_full_range() {
        let field = fbm(&small());
        assert_eq!(field.width(), 48);
        assert_eq!(field.height(), 32);
        assert_eq!(field.as_slice().len(), 48 * 32);
        // Remapping stretches to the extremes
        assert_eq!(field.range(), (0, 255));
    }

    #[test]
    fn test_deterministic() {
        let params = FbmParams { x_offset: 13.5, y_offset: -7.0, z: 0.4, ..small() };
        assert_eq!(fbm(&params), fbm(&params));
    }

    #[test]
    fn test_offset_changes_output() {
        let a = fbm(&small());
        let b = fbm(&FbmParams { x_offset: 100.0, ..small() });
        assert_ne!(a, b);
    }

    #[test]
    fn test_various_parameters_stay_bounded() {
        let cases = [
            FbmParams { octaves: 1, ..small() },
            FbmParams { octaves: 16, lacunarity: 16.0, gain: 5.0, ..small() },
            FbmParams { scale: -3.0, gain: 0.1, ..small() },
            FbmParams { width: 1, height: 1, ..small() },
            FbmParams { falloff: Some(1.0), ..small() },
        ];
        for params in &cases {
            let field = fbm(params);
            assert_eq!(field.as_slice().len(), (params.width * params.height) as usize);
        }
    }

    #[test]
    fn test_single_pixel_is_flat() {
        let field = fbm(&FbmParams { width: 1, height: 1, ..small() });
        assert_eq!(field.get(0, 0), Some(255));
    }

    #[test]
    fn test_falloff_darkens_edges() {
        let plain = fbm(&small());
        let island = fbm(&FbmParams { falloff: Some(1.0), ..small() });
        // Corners sit at distance 1 and get pushed down to 0
        assert_eq!(island.get(0, 0), Some(0));
        assert_eq!(island.get(47, 31), Some(0));
        for (a, b) in plain.as_slice().iter().zip(island.as_slice()) {
            assert!(b <= a);
        }
    }

    #[test]
    fn test_radial_distance() {
        assert_eq!(radial_distance(0, 0, 5, 5), 1.0);
        assert_eq!(radial_distance(2, 2, 5, 5), 0.0);
        assert_eq!(radial_distance(0, 0, 1, 1), 0.0);
    }
}
