//! Pinhole camera.
//!
//! # Coordinate System
//!
//! Uses a **left-handed** coordinate system:
//! - X: positive right
//! - Y: positive up
//! - Z: positive forward (into screen)
//!
//! The user-facing [`Camera`] only stores a position, a viewing direction and
//! a field of view. Every frame the renderer derives a [`CameraBasis`] from it:
//! right/up vectors built against a fixed world-up, the tangent of the half
//! field of view, and the aspect ratio of the target.

use crate::math::{Vec2, Vec3};

/// Views with a depth at or below this are treated as behind the camera.
pub const NEAR_PLANE: f32 = 0.01;

/// Sub-pixel offsets cycled per frame for temporal anti-aliasing.
pub const JITTER_PATTERN: [Vec2; 4] = [
    Vec2::new(0.5, 0.5),
    Vec2::new(-0.5, 0.5),
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
];

/// Position, viewing direction and vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    fov_degrees: f32,
    jitter: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 2.0, -7.0), Vec3::new(0.0, -0.15, 1.0), 30.0)
    }
}

impl Camera {
    /// `forward` is normalized; it does not need to be unit length.
    pub fn new(position: Vec3, forward: Vec3, fov_degrees: f32) -> Self {
        Self {
            position,
            forward: forward.normalize(),
            fov_degrees,
            jitter: Vec2::ZERO,
        }
    }

    /// Creates a camera at `position` looking toward `target`.
    pub fn looking_at(position: Vec3, target: Vec3, fov_degrees: f32) -> Self {
        Self::new(position, target - position, fov_degrees)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn jitter(&self) -> Vec2 {
        self.jitter
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_forward(&mut self, forward: Vec3) {
        self.forward = forward.normalize();
    }

    pub fn set_fov_degrees(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
    }

    /// Sets an explicit screen-space offset added to every projected vertex.
    pub fn set_jitter(&mut self, jitter: Vec2) {
        self.jitter = jitter;
    }

    /// Selects the jitter offset for `frame` from [`JITTER_PATTERN`].
    pub fn set_jitter_for_frame(&mut self, frame: u64) {
        self.jitter = JITTER_PATTERN[(frame & 3) as usize];
    }

    /// Moves the camera along its viewing direction.
    pub fn move_forward(&mut self, distance: f32) {
        self.position = self.position + self.forward * distance;
    }

    /// Derives the per-frame projection basis for a `width` x `height` target.
    pub fn basis(&self, width: usize, height: usize) -> CameraBasis {
        let forward = self.forward;
        let mut right = Vec3::UP.cross(forward);
        // Looking straight up or down: world-up gives no horizontal axis.
        if right.length_squared() < 1e-12 {
            right = Vec3::RIGHT;
        }
        let right = right.normalize();
        let up = forward.cross(right);

        CameraBasis {
            position: self.position,
            forward,
            right,
            up,
            view_dir: -forward,
            fov_scale: (self.fov_degrees * 0.5).to_radians().tan(),
            aspect: width as f32 / height.max(1) as f32,
            width: width as f32,
            height: height as f32,
            jitter: self.jitter,
        }
    }
}

/// Per-frame camera state consumed by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Direction toward the viewer, used for the specular half vector.
    pub view_dir: Vec3,
    /// `tan(fov / 2)`.
    pub fov_scale: f32,
    pub aspect: f32,
    pub width: f32,
    pub height: f32,
    pub jitter: Vec2,
}

impl CameraBasis {
    /// Distance of `point` along the viewing direction.
    #[inline]
    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward)
    }

    /// Projects a world-space point with known view depth `z` to pixel
    /// coordinates, jitter included.
    ///
    /// No near-plane handling: callers decide what to do with `z <= 0`.
    #[inline]
    pub fn project(&self, point: Vec3, z: f32) -> Vec2 {
        let rel = point - self.position;
        let x = rel.dot(self.right) / (z * self.fov_scale * self.aspect);
        let y = rel.dot(self.up) / (z * self.fov_scale);
        Vec2::new(
            (x + 1.0) * 0.5 * self.width + self.jitter.x,
            (1.0 - y) * 0.5 * self.height + self.jitter.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn basis_is_orthonormal() {
        let camera = Camera::default();
        let b = camera.basis(800, 600);
        assert_relative_eq!(b.right.magnitude(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.up.magnitude(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.right.dot(b.forward), 0.0, epsilon = 1e-6);
        assert_relative_eq!(b.up.dot(b.forward), 0.0, epsilon = 1e-6);
        assert!(b.up.y > 0.0);
    }

    #[test]
    fn point_on_axis_projects_to_screen_center() {
        let camera = Camera::new(Vec3::ZERO, Vec3::FORWARD, 60.0);
        let b = camera.basis(800, 600);
        let p = Vec3::new(0.0, 0.0, 5.0);
        let s = b.project(p, b.view_depth(p));
        assert_relative_eq!(s.x, 400.0);
        assert_relative_eq!(s.y, 300.0);
    }

    #[test]
    fn right_and_up_map_to_screen_right_and_top() {
        let camera = Camera::new(Vec3::ZERO, Vec3::FORWARD, 60.0);
        let b = camera.basis(800, 600);
        let p = Vec3::new(1.0, 1.0, 5.0);
        let s = b.project(p, b.view_depth(p));
        assert!(s.x > 400.0);
        assert!(s.y < 300.0);
    }

    #[test]
    fn jitter_shifts_projection() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::FORWARD, 60.0);
        camera.set_jitter_for_frame(2);
        let b = camera.basis(800, 600);
        let p = Vec3::new(0.0, 0.0, 5.0);
        let s = b.project(p, b.view_depth(p));
        assert_relative_eq!(s.x, 399.5);
        assert_relative_eq!(s.y, 299.5);
    }

    #[test]
    fn vertical_forward_still_has_a_basis() {
        let camera = Camera::new(Vec3::ZERO, Vec3::UP, 45.0);
        let b = camera.basis(100, 100);
        assert!(b.right.is_finite() && b.up.is_finite());
        assert_relative_eq!(b.right.magnitude(), 1.0, epsilon = 1e-6);
    }
}
