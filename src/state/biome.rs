use crate::state::bitmap::{pack_rgb, Rgba};

/// Upper bound on live biomes.
pub const MAX_BIOMES: usize = 16;

/// Stable biome handle. Allocated from a counter that only grows, so an id
/// keeps meaning the same record across re-sorts and is never handed out
/// again after removal.
pub type BiomeId = u32;

/// A classification rule: heights up to `threshold` take `color`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biome {
    pub id: BiomeId,
    pub color: Rgba,
    /// Upper bound in normalized 0..1 height
    pub threshold: f32,
}

/// Biomes ordered ascending by threshold.
///
/// Ties keep insertion order (the sort is stable). Color-only edits never
/// reorder.
#[derive(Debug, Clone, Default)]
pub struct BiomeStore {
    biomes: Vec<Biome>,
    next_id: BiomeId,
}

impl BiomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.biomes.len() >= MAX_BIOMES
    }

    pub fn iter(&self) -> impl Iterator<Item = &Biome> {
        self.biomes.iter()
    }

    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.iter().find(|b| b.id == id)
    }

    fn resort(&mut self) {
        self.biomes.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
    }

    /// Add a biome. Returns `None` once the store holds [`MAX_BIOMES`].
    pub fn add(&mut self, color: Rgba, threshold: f32) -> Option<BiomeId> {
        if self.is_full() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.biomes.push(Biome { id, color, threshold });
        self.resort();
        Some(id)
    }

    /// Add the default biome: white, covering everything up to 1.0.
    pub fn add_default(&mut self) -> Option<BiomeId> {
        self.add(Rgba::WHITE, 1.0)
    }

    /// Remove by id. Remaining biomes keep their order.
    pub fn remove(&mut self, id: BiomeId) -> bool {
        match self.biomes.iter().position(|b| b.id == id) {
            Some(idx) => {
                self.biomes.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Update color and/or threshold in place. Only a threshold change
    /// re-sorts. Returns false for unknown ids.
    pub fn edit(&mut self, id: BiomeId, color: Option<Rgba>, threshold: Option<f32>) -> bool {
        let Some(biome) = self.biomes.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        if let Some(color) = color {
            biome.color = color;
        }
        if let Some(threshold) = threshold {
            if biome.threshold != threshold {
                biome.threshold = threshold;
                self.resort();
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.biomes.clear();
    }

    /// Replace every biome (bulk import). Entries past [`MAX_BIOMES`] are
    /// dropped. Ids keep counting up from where they were.
    pub fn replace_all(&mut self, rules: impl IntoIterator<Item = (Rgba, f32)>) -> usize {
        self.clear();
        for (color, threshold) in rules {
            if self.add(color, threshold).is_none() {
                break;
            }
        }
        self.len()
    }

    /// Color for a normalized height: the first biome whose threshold is at
    /// least `height`. Heights above every threshold fall back to the
    /// *first* biome, not the last.
    ///
    /// Returns `None` only for an empty store; callers render grayscale then.
    pub fn classify(&self, height: f32) -> Option<Rgba> {
        let first = self.biomes.first()?;
        let hit = self.biomes.iter().find(|b| b.threshold >= height).unwrap_or(first);
        Some(hit.color)
    }

    /// Packed pixel for an 8-bit height, using grayscale when biome mode is
    /// off or the store is empty.
    pub fn classify_or_gray(&self, height: u8, enabled: bool) -> u32 {
        if enabled {
            if let Some(color) = self.classify(height as f32 / 255.0) {
                return color.pack();
            }
        }
        pack_rgb(height, height, height)
    }
}
