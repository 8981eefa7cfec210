//! Perlin noise kernel
//!
//! - `perlin` - 3D gradient noise over a fixed permutation table
//! - `fbm` - octave summation and normalization to an 8-bit field
//! - `field` - the `HeightField` grid the other two produce
//!
//! Everything here is pure: no shared state, same inputs give the same field.

mod perlin;
mod fbm;
mod field;

pub use perlin::perlin3;
pub use fbm::{fbm, FbmParams};
pub use field::HeightField;
