//! Object placement in the world.
//!
//! A [`Transform`] is the position / Euler rotation / scale triple that the
//! scene layer animates. The rasterizer only ever asks it for two matrices:
//! the world matrix for vertices and the normal matrix for shading normals.

use crate::math::{Mat4, Vec3};

/// Position, rotation (Euler angles, radians) and per-axis scale.
///
/// Setters return `&mut Self` for chaining:
///
/// ```ignore
/// transform
///     .set_position(Vec3::new(0.0, 1.0, 5.0))
///     .rotate(Vec3::new(0.0, 0.1, 0.0))
///     .set_scale(Vec3::splat(0.65));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Adds a delta to the Euler angles.
    pub fn rotate(&mut self, delta: Vec3) -> &mut Self {
        self.rotation = self.rotation + delta;
        self
    }

    /// Rotation about X, then Y, then Z.
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::rotation_z(self.rotation.z)
            * Mat4::rotation_y(self.rotation.y)
            * Mat4::rotation_x(self.rotation.x)
    }

    /// Local → world: scale, then rotate, then translate.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::translation(self.position.x, self.position.y, self.position.z)
            * self.rotation_matrix()
            * Mat4::scaling(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Inverse transpose of the rotation+scale block, which for `R * S` is
    /// simply `R * S^-1`.
    ///
    /// A zero scale component maps to zero rather than infinity; the
    /// resulting normal is degenerate and the triangle culls itself.
    pub fn normal_matrix(&self) -> Mat4 {
        let inv = |s: f32| if s != 0.0 { 1.0 / s } else { 0.0 };
        self.rotation_matrix()
            * Mat4::scaling(inv(self.scale.x), inv(self.scale.y), inv(self.scale.z))
    }
}
