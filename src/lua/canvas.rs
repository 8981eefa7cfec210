//! The `Bitmap` object scripts receive in `frame(bitmap)`.
//!
//! Methods: `pset(x, y, color)`, `pget(x, y)`, `get(x, y)` (low byte only,
//! i.e. the red channel, which equals the gray level before any recolouring),
//! `width()`, `height()`. Coordinates are 0-based.

use mlua::{UserData, UserDataMethods};

use crate::state::Bitmap;

fn coords(bitmap: &Bitmap, x: i64, y: i64) -> mlua::Result<(u32, u32)> {
    if x < 0 || y < 0 || x >= bitmap.width() as i64 || y >= bitmap.height() as i64 {
        return Err(mlua::Error::runtime(format!(
            "pixel ({}, {}) outside {}x{} bitmap",
            x,
            y,
            bitmap.width(),
            bitmap.height()
        )));
    }
    Ok((x as u32, y as u32))
}

impl UserData for Bitmap {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("pset", |_, this, (x, y, color): (i64, i64, i64)| {
            let (x, y) = coords(this, x, y)?;
            this.set(x, y, color as u32);
            Ok(())
        });

        methods.add_method("pget", |_, this, (x, y): (i64, i64)| {
            let (x, y) = coords(this, x, y)?;
            Ok(this.get(x, y).unwrap_or(0))
        });

        methods.add_method("get", |_, this, (x, y): (i64, i64)| {
            let (x, y) = coords(this, x, y)?;
            Ok(this.get(x, y).unwrap_or(0) & 0xFF)
        });

        methods.add_method("width", |_, this, ()| Ok(this.width()));
        methods.add_method("height", |_, this, ()| Ok(this.height()));
    }
}
