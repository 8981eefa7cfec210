//! Classic 3D Perlin gradient noise over a fixed permutation table.

/// The 12 edge-midpoint gradients of a cube.
const GRADIENTS: [[f32; 3]; 12] = [
    [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0], [0.0, -1.0, 1.0], [0.0, 1.0, -1.0], [0.0, -1.0, -1.0],
];

/// Fixed permutation of 0..=255. Lookups go through [`perm`], which wraps
/// indices into the doubled 512-entry table without storing it twice.
const PERMUTATION: [u8; 256] = [
    182, 232, 51, 15, 55, 119, 7, 107, 230, 227, 6, 34, 216, 61, 183, 36,
    40, 134, 74, 45, 157, 78, 81, 114, 145, 9, 209, 189, 147, 58, 126, 0,
    240, 169, 228, 235, 67, 198, 72, 64, 88, 98, 129, 194, 99, 71, 30, 127,
    18, 150, 155, 179, 132, 62, 116, 200, 251, 178, 32, 140, 130, 139, 250, 26,
    151, 203, 106, 123, 53, 255, 75, 254, 86, 234, 223, 19, 199, 244, 241, 1,
    172, 70, 24, 97, 196, 10, 90, 246, 252, 68, 84, 161, 236, 205, 80, 91,
    233, 225, 164, 217, 239, 220, 20, 46, 204, 35, 31, 175, 154, 17, 133, 117,
    73, 224, 125, 65, 77, 173, 3, 2, 242, 221, 120, 218, 56, 190, 166, 11,
    138, 208, 231, 50, 135, 109, 213, 187, 152, 201, 47, 168, 185, 186, 167, 165,
    102, 153, 156, 49, 202, 69, 195, 92, 21, 229, 63, 104, 197, 136, 148, 94,
    171, 93, 59, 149, 23, 144, 160, 57, 76, 141, 96, 158, 163, 219, 237, 113,
    206, 181, 112, 111, 191, 137, 207, 215, 13, 83, 238, 249, 100, 131, 118, 243,
    162, 248, 43, 66, 226, 27, 211, 95, 214, 105, 108, 101, 170, 128, 210, 87,
    38, 44, 174, 188, 176, 39, 14, 143, 159, 16, 124, 222, 33, 247, 37, 245,
    8, 4, 22, 82, 110, 180, 184, 12, 25, 5, 193, 41, 85, 177, 192, 253,
    79, 29, 115, 103, 142, 146, 52, 48, 89, 54, 121, 212, 122, 60, 28, 42,
];

/// Index into the doubled table; `i` is always < 512.
#[inline]
fn perm(i: usize) -> usize {
    PERMUTATION[i & 0xFF] as usize
}

/// Quintic interpolation (smootherstep)
#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

#[inline]
fn dot(g: &[f32; 3], x: f32, y: f32, z: f32) -> f32 {
    g[0] * x + g[1] * y + g[2] * z
}

/// 3D Perlin noise at `(x, y, z)`, roughly in [-1, 1].
///
/// Corner `i` of the lattice cell uses bit 2 for x, bit 1 for y and bit 0
/// for z. Integer coordinates always evaluate to exactly 0.
pub fn perlin3(x: f32, y: f32, z: f32) -> f32 {
    let fx = x.floor();
    let fy = y.floor();
    let fz = z.floor();

    let rx = x - fx;
    let ry = y - fy;
    let rz = z - fz;

    let gx = (fx as i32 & 0xFF) as usize;
    let gy = (fy as i32 & 0xFF) as usize;
    let gz = (fz as i32 & 0xFF) as usize;

    let mut n = [0.0f32; 8];
    for (i, corner) in n.iter_mut().enumerate() {
        let (cx, cy, cz) = ((i >> 2) & 1, (i >> 1) & 1, i & 1);
        let hash = perm(gx + cx + perm(gy + cy + perm(gz + cz)));
        let g = &GRADIENTS[hash % 12];
        *corner = dot(g, rx - cx as f32, ry - cy as f32, rz - cz as f32);
    }

    let u = fade(rx);
    let v = fade(ry);
    let w = fade(rz);

    let mut nx = [0.0f32; 4];
    for i in 0..4 {
        nx[i] = lerp(n[i], n[4 + i], u);
    }
    let nxy0 = lerp(nx[0], nx[2], v);
    let nxy1 = lerp(nx[1], nx[3], v);

    lerp(nxy0, nxy1, w)
}
