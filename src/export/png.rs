use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::info;

use crate::error::{Error, Result};
use crate::state::{unpack, Bitmap};

/// Default export name, e.g. `Perlin 2024-03-01 at 17.04.59.png`.
pub fn timestamped_file_name() -> String {
    chrono::Local::now().format("Perlin %Y-%m-%d at %H.%M.%S.png").to_string()
}

fn rgb_bytes(bitmap: &Bitmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(bitmap.pixels().len() * 3);
    for &pixel in bitmap.pixels() {
        let [r, g, b, _] = unpack(pixel);
        out.extend_from_slice(&[r, g, b]);
    }
    out
}

/// Encode as an 8-bit RGB PNG, alpha dropped.
pub fn encode_png(bitmap: &Bitmap, out: impl Write) -> Result<()> {
    PngEncoder::new(out)
        .write_image(&rgb_bytes(bitmap), bitmap.width(), bitmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| Error::Export(e.to_string()))
}

pub fn export_png(bitmap: &Bitmap, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Export(format!("cannot create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    encode_png(bitmap, &mut writer)?;
    writer
        .flush()
        .map_err(|e| Error::Export(format!("cannot write {}: {}", path.display(), e)))?;
    info!("exported {}x{} to {}", bitmap.width(), bitmap.height(), path.display());
    Ok(())
}
