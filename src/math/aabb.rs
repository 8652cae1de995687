//! Axis-aligned bounding boxes and the slab ray test.
//!
//! The shadow/reflection stage uses object boxes as cheap occlusion proxies
//! instead of intersecting triangles.
//!
//! # Slab method
//!
//! A box is the intersection of three slabs, each bounded by a pair of planes
//! perpendicular to one axis. For a ray `o + t*d` the parametric interval
//! inside the slab for axis `a` is
//!
//! ```text
//! t0 = (min[a] - o[a]) / d[a]
//! t1 = (max[a] - o[a]) / d[a]
//! ```
//!
//! The ray is inside the box for `t` in `[max(min(t0, t1)), min(max(t0, t1))]`
//! taken over all three axes. The box is hit when that interval is non-empty
//! and ends in front of the origin.

use super::mat4::Mat4;
use super::vec3::Vec3;

/// Reciprocal used for a ray direction component too small to divide by.
///
/// Large enough that the slab for that axis either spans the whole ray (origin
/// inside it) or is pushed out of reach (origin outside it).
const INV_DIR_CLAMP: f32 = 1e6;
const DIR_EPSILON: f32 = 1e-6;

/// A ray with its reciprocal direction precomputed for repeated slab tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let recip = |d: f32| {
            if d.abs() > DIR_EPSILON {
                1.0 / d
            } else {
                INV_DIR_CLAMP
            }
        };
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(recip(direction.x), recip(direction.y), recip(direction.z)),
        }
    }

    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }
}

/// World- or object-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The inverted box: union with any point yields that point.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all `points`. Returns [`Aabb::EMPTY`] for none.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |bounds, p| bounds.expanded_to(p))
    }

    pub fn expanded_to(&self, p: Vec3) -> Self {
        Self::new(self.min.min(p), self.max.max(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Box enclosing this box after `matrix` is applied to all of its corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().iter().map(|&c| *matrix * c))
    }

    /// Slab test. Returns the parametric entry/exit interval `(t_min, t_max)`
    /// when the ray hits the box in front of its origin.
    ///
    /// `t_min` is negative when the origin lies inside the box.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv = ray.inv_direction;
        let o = ray.origin;

        let tx0 = (self.min.x - o.x) * inv.x;
        let tx1 = (self.max.x - o.x) * inv.x;
        let ty0 = (self.min.y - o.y) * inv.y;
        let ty1 = (self.max.y - o.y) * inv.y;
        let tz0 = (self.min.z - o.z) * inv.z;
        let tz1 = (self.max.z - o.z) * inv.z;

        let t_min = tx0.min(tx1).max(ty0.min(ty1)).max(tz0.min(tz1));
        let t_max = tx0.max(tx1).min(ty0.max(ty1)).min(tz0.max(tz1));

        if t_max >= t_min && t_max > 0.0 {
            Some((t_min, t_max))
        } else {
            None
        }
    }

    /// True when the ray hits the box in front of its origin.
    #[inline]
    pub fn hit(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
