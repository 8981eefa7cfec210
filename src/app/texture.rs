use crate::state::Bitmap;

/// GPU side of the canvas. The bitmap's bytes are RGBA in memory order.
pub trait TextureSink {
    /// Drop the old texture and allocate one of the new size.
    fn recreate(&mut self, width: u32, height: u32);
    fn upload(&mut self, bitmap: &Bitmap);
}

/// Sink for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTexture;

impl TextureSink for NullTexture {
    fn recreate(&mut self, _width: u32, _height: u32) {}
    fn upload(&mut self, _bitmap: &Bitmap) {}
}
