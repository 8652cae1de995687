//! Lighting types for the renderer.

use crate::math::Vec3;

/// A directional light that illuminates the scene uniformly from a direction.
///
/// Directional lights are ideal for simulating distant light sources like the sun,
/// where all rays are effectively parallel. The same direction drives surface
/// shading and the shadow rays of the post-process stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Normalized direction from a surface *toward* the light.
    pub direction: Vec3,
    /// Fraction of the base colour applied regardless of orientation.
    pub ambient_intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(0.5, 0.7, -0.5))
    }
}

impl DirectionalLight {
    /// Create a light shining from `direction`. The direction is normalized.
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction: direction.normalize(),
            ambient_intensity: 0.1,
        }
    }

    /// Lambert term: clamped cosine between the surface normal and the light.
    #[inline]
    pub fn intensity(&self, normal: Vec3) -> f32 {
        self.direction.dot(normal).max(0.0)
    }

    /// Blinn half vector between the light and a direction toward the viewer.
    #[inline]
    pub fn half_vector(&self, view_dir: Vec3) -> Vec3 {
        (self.direction + view_dir).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_direct_illumination() {
        let light = DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(light.intensity(Vec3::FORWARD), 1.0);
    }

    #[test]
    fn test_no_illumination() {
        let light = DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(light.intensity(-Vec3::FORWARD), 0.0);
    }

    #[test]
    fn test_angled_illumination() {
        // Light straight above, normal at 45 degrees
        let light = DirectionalLight::new(Vec3::new(0.0, 3.0, 0.0));
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert_relative_eq!(light.intensity(normal), 0.70710677, epsilon = 1e-5);
    }

    #[test]
    fn half_vector_bisects_light_and_view() {
        let light = DirectionalLight::new(Vec3::UP);
        let h = light.half_vector(Vec3::RIGHT);
        assert_relative_eq!(h.x, h.y, epsilon = 1e-6);
        assert_relative_eq!(h.magnitude(), 1.0, epsilon = 1e-6);
    }
}
