/// RGBA colour with channels in 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Channels scaled to 0..255, truncated.
    pub fn to_bytes(self) -> [u8; 4] {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        [byte(self.r), byte(self.g), byte(self.b), byte(self.a)]
    }

    pub fn pack(self) -> u32 {
        let [r, g, b, a] = self.to_bytes();
        pack_rgba(r, g, b, a)
    }
}

/// Pack into the canvas pixel layout: alpha in the top byte, red in the low
/// byte, so the little-endian bytes read R, G, B, A.
#[inline]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

/// Opaque colour, as scripts build it with `RGB(r, g, b)`.
#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    pack_rgba(r, g, b, 255)
}

#[inline]
pub const fn unpack(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// The canvas: packed 32-bit pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate for new dimensions. Returns false (and keeps the storage)
    /// when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        *self = Bitmap::new(width, height);
        true
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: u32, y: u32, pixel: u32) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = pixel;
                true
            }
            None => false,
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Raw RGBA bytes, as handed to a texture upload.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| unpack(*p)).collect()
    }
}
