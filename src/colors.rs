//! Packed `0xAARRGGBB` colour helpers.
//!
//! The color buffer stores one `u32` per pixel in this layout, which is also
//! what SDL's `ARGB8888` streaming textures expect on little-endian hosts.

use crate::math::Vec3;

/// Alpha channel of a fully opaque pixel.
pub const OPAQUE: u32 = 0xFF00_0000;

pub const BLACK: u32 = 0xFF00_0000;
pub const WHITE: u32 = 0xFFFF_FFFF;

/// Reflection colour used when a reflected ray misses every object.
pub const SKY: u32 = 0xFF8C_B4E6;

/// Default clear colour for the color buffer.
pub const BACKGROUND: u32 = BLACK;

/// Packs normalized channels into `0xAARRGGBB`, clamping each to `[0, 1]`.
#[inline]
pub fn pack_color(r: f32, g: f32, b: f32, a: f32) -> u32 {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u32;
    (to_u8(a) << 24) | (to_u8(r) << 16) | (to_u8(g) << 8) | to_u8(b)
}

/// Packs an RGB vector with full opacity.
#[inline]
pub fn pack_rgb(rgb: Vec3) -> u32 {
    pack_color(rgb.x, rgb.y, rgb.z, 1.0)
}

/// Unpacks the RGB channels to `[0, 1]`. Alpha is dropped.
#[inline]
pub fn unpack_color(color: u32) -> (f32, f32, f32) {
    let r = ((color >> 16) & 0xFF) as f32 / 255.0;
    let g = ((color >> 8) & 0xFF) as f32 / 255.0;
    let b = (color & 0xFF) as f32 / 255.0;
    (r, g, b)
}

#[inline]
pub fn unpack_rgb(color: u32) -> Vec3 {
    let (r, g, b) = unpack_color(color);
    Vec3::new(r, g, b)
}

#[inline]
fn channels(color: u32) -> [u32; 3] {
    [(color >> 16) & 0xFF, (color >> 8) & 0xFF, color & 0xFF]
}

#[inline]
fn from_channels([r, g, b]: [u32; 3]) -> u32 {
    OPAQUE | (r << 16) | (g << 8) | b
}

/// Equal-weight blend of two colours, per channel, result fully opaque.
#[inline]
pub fn blend_half(a: u32, b: u32) -> u32 {
    let (ca, cb) = (channels(a), channels(b));
    from_channels([
        (ca[0] + cb[0]) >> 1,
        (ca[1] + cb[1]) >> 1,
        (ca[2] + cb[2]) >> 1,
    ])
}

/// Fixed-point darken by a shadow value in `[0, 1]` (1 = fully lit).
///
/// The factor is `128 + 128 * shadow` in 1/256 units, so a lit pixel keeps
/// its colour and a fully shadowed pixel drops to half brightness.
#[inline]
pub fn darken(color: u32, shadow: f32) -> u32 {
    let factor = (128.0 + 128.0 * shadow.clamp(0.0, 1.0)) as u32;
    let [r, g, b] = channels(color);
    from_channels([(r * factor) >> 8, (g * factor) >> 8, (b * factor) >> 8])
}
