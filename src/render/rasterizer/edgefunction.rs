//! Edge-function rasterization into the G-buffer.
//!
//! A [`ScreenTriangle`] covers the pixels whose centres lie on the inner side
//! of all three edges. Every accepted fragment writes depth, normal, world
//! position, colour and reflection direction together, and only when it is
//! strictly nearer than what the pixel already holds.
//!
//! # Edge Function
//!
//! For an edge from point A to point B, the edge function at point P is:
//!
//! ```text
//! E(P) = (P.x - A.x) * (B.y - A.y) - (P.y - A.y) * (B.x - A.x)
//! ```
//!
//! E is linear in P, so along a row it is stepped by a constant per pixel.
//! Each row restarts from a direct evaluation at its first pixel, which makes
//! the result for a pixel independent of which rows were rasterized before it
//! (a band of rows produces exactly what the full frame would).
//!
//! # Perspective-correct depth
//!
//! Screen-space barycentrics `w_i / area` are weighted by each vertex's inverse
//! view depth `1/z_i`. Their sum is the interpolated `1/z`, whose reciprocal is
//! the stored depth; the normalized weights `w_i/z_i / Σ w_j/z_j` blend the
//! world positions.
//!
//! # Reflection directions
//!
//! Accepted fragments are gathered four at a time and their view rays are
//! normalized and reflected with [`batch::normalize4`] /
//! [`batch::reflect_normalize4`]. The last 0-3 pixels of a row go through the
//! scalar versions.

use super::shader::PixelShader;
use crate::math::batch;
use crate::math::{Vec2, Vec3};
use crate::render::frame::GBufferRows;

/// Triangles with an absolute doubled screen area at or below this are skipped.
const MIN_AREA: f32 = 1e-8;

/// Computes the edge function value for point P relative to edge (A -> B).
///
/// # Returns
///
/// - Positive: P is to the left of edge AB
/// - Negative: P is to the right of edge AB
/// - Zero: P lies exactly on the edge AB
#[inline]
fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// A world-space triangle projected to the screen, ready to rasterize.
#[derive(Debug, Clone)]
pub struct ScreenTriangle<S> {
    world: [Vec3; 3],
    screen: [Vec2; 3],
    inv_z: [f32; 3],
    normal: Vec3,
    inv_area: f32,
    area_sign: f32,
    /// Inclusive pixel bounds, already clipped to the frame.
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    shader: S,
}

impl<S: PixelShader> ScreenTriangle<S> {
    /// Sets up a triangle for a `width` x `height` frame.
    ///
    /// Returns `None` when it cannot produce any pixel: non-finite
    /// projection, (near) zero area, or a bounding box entirely off-frame.
    pub fn new(
        world: [Vec3; 3],
        screen: [Vec2; 3],
        view_z: [f32; 3],
        normal: Vec3,
        width: usize,
        height: usize,
        shader: S,
    ) -> Option<Self> {
        if screen.iter().any(|s| !s.x.is_finite() || !s.y.is_finite()) {
            return None;
        }

        let area = edge_function(screen[0], screen[1], screen[2]);
        if area.abs() <= MIN_AREA {
            return None;
        }

        let [s0, s1, s2] = screen;
        let min_x = (s0.x.min(s1.x).min(s2.x).floor() as i64).max(0);
        let max_x = (s0.x.max(s1.x).max(s2.x).floor() as i64).min(width as i64 - 1);
        let min_y = (s0.y.min(s1.y).min(s2.y).floor() as i64).max(0);
        let max_y = (s0.y.max(s1.y).max(s2.y).floor() as i64).min(height as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return None;
        }

        Some(Self {
            world,
            screen,
            inv_z: view_z.map(|z| 1.0 / z),
            normal,
            inv_area: 1.0 / area,
            area_sign: if area > 0.0 { 1.0 } else { -1.0 },
            min_x: min_x as usize,
            max_x: max_x as usize,
            min_y: min_y as usize,
            max_y: max_y as usize,
            shader,
        })
    }

    /// Inclusive row range covered by the bounding box.
    pub fn rows(&self) -> (usize, usize) {
        (self.min_y, self.max_y)
    }

    pub fn shader(&self) -> &S {
        &self.shader
    }

    /// Rasterizes the part of the triangle inside `target`'s rows.
    ///
    /// `eye` is the camera position the reflection rays start from. Pixels
    /// outside the target are skipped, also when the triangle was set up
    /// for a larger frame.
    pub fn rasterize(&self, eye: Vec3, target: &mut GBufferRows<'_>) {
        if target.width == 0 {
            return;
        }
        let rows = target.rows.min(target.depth.len() / target.width);
        if rows == 0 || self.min_x >= target.width {
            return;
        }
        let x_end = self.max_x.min(target.width - 1);
        let y_start = self.min_y.max(target.y0);
        let y_end = self.max_y.min(target.y0 + rows - 1);
        if y_start > y_end {
            return;
        }

        let [s0, s1, s2] = self.screen;
        let dx = [s2.y - s1.y, s0.y - s2.y, s1.y - s0.y];
        let start_x = self.min_x as f32 + 0.5;

        for y in y_start..=y_end {
            let p = Vec2::new(start_x, y as f32 + 0.5);
            let mut w = [
                edge_function(s1, s2, p),
                edge_function(s2, s0, p),
                edge_function(s0, s1, p),
            ];
            let row = (y - target.y0) * target.width;

            let mut x = self.min_x;
            while x + 3 <= x_end {
                let mut rays = [Vec3::RIGHT; 4];
                let mut slots = [0usize; 4];
                let mut count = 0;
                for k in 0..4 {
                    let kf = k as f32;
                    let cw = [w[0] + dx[0] * kf, w[1] + dx[1] * kf, w[2] + dx[2] * kf];
                    let idx = row + x + k;
                    if let Some(position) = self.write_fragment(cw, idx, target) {
                        rays[count] = position - eye;
                        slots[count] = idx;
                        count += 1;
                    }
                }
                if count > 0 {
                    batch::normalize4(&mut rays);
                    let reflected = batch::reflect_normalize4(&rays, self.normal);
                    for k in 0..count {
                        target.reflect[slots[k]] = reflected[k];
                    }
                }
                for (wi, d) in w.iter_mut().zip(dx) {
                    *wi += d * 4.0;
                }
                x += 4;
            }

            while x <= x_end {
                let idx = row + x;
                if let Some(position) = self.write_fragment(w, idx, target) {
                    let ray = batch::normalize(position - eye);
                    target.reflect[idx] = batch::reflect_normalize(ray, self.normal);
                }
                for (wi, d) in w.iter_mut().zip(dx) {
                    *wi += d;
                }
                x += 1;
            }
        }
    }

    /// Coverage + depth test for one pixel; on success writes depth, normal,
    /// world position and colour and returns the world position.
    #[inline]
    fn write_fragment(&self, w: [f32; 3], idx: usize, target: &mut GBufferRows<'_>) -> Option<Vec3> {
        let s = self.area_sign;
        if w[0] * s < 0.0 || w[1] * s < 0.0 || w[2] * s < 0.0 {
            return None;
        }

        let p = [w[0] * self.inv_z[0], w[1] * self.inv_z[1], w[2] * self.inv_z[2]];
        let p_sum = p[0] + p[1] + p[2];
        let depth = 1.0 / (p_sum * self.inv_area);
        // Also rejects NaN and the infinite depth of a zero weight sum.
        if !(depth > 0.0 && depth < target.depth[idx]) {
            return None;
        }

        let inv_p_sum = 1.0 / p_sum;
        let [v0, v1, v2] = self.world;
        let position = (v0 * p[0] + v1 * p[1] + v2 * p[2]) * inv_p_sum;

        target.depth[idx] = depth;
        target.normal[idx] = self.normal;
        target.position[idx] = position;
        target.color[idx] = self.shader.shade([
            w[0] * self.inv_area,
            w[1] * self.inv_area,
            w[2] * self.inv_area,
        ]);
        Some(position)
    }
}
