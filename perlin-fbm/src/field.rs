//! Row-major 8-bit height grid.

/// A `width * height` grid of 8-bit heights, row-major (`y * width + x`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightField {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl HeightField {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Height at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.data[self.index(x, y)])
        } else {
            None
        }
    }

    /// Set the height at `(x, y)`. Returns false outside the grid.
    pub fn set(&mut self, x: u32, y: u32, value: u8) -> bool {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx] = value;
            true
        } else {
            false
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Smallest and largest height in the grid.
    pub fn range(&self) -> (u8, u8) {
        self.data
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}
