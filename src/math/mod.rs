//! Vector, matrix and bounding-volume math.

pub mod aabb;
pub mod batch;
pub mod mat4;
pub mod vec2;
pub mod vec3;

pub use aabb::{Aabb, Ray};
pub use mat4::Mat4;
pub use vec2::Vec2;
pub use vec3::Vec3;
