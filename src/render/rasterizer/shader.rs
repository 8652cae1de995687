//! Per-triangle colour for the G-buffer.
//!
//! Every triangle is lit once during setup: its flat normal and material go
//! through [`shade_material`] and the packed result is stored in a
//! [`MaterialShader`]. The rasterizer asks the shader for the colour of each
//! fragment that wins the depth test.

use crate::camera::CameraBasis;
use crate::colors::pack_rgb;
use crate::light::DirectionalLight;
use crate::material::Material;
use crate::math::Vec3;

/// Colour source for fragments that pass the depth test.
///
/// `lambda` holds the screen-space barycentric weights of the fragment.
pub trait PixelShader {
    fn shade(&self, lambda: [f32; 3]) -> u32;
}

/// Light terms shared by every triangle of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingSetup {
    /// Direction toward the light.
    pub light_dir: Vec3,
    /// Blinn half vector between the light and the camera's view direction.
    pub half_vector: Vec3,
    pub ambient: f32,
}

impl ShadingSetup {
    pub fn new(light: &DirectionalLight, basis: &CameraBasis) -> Self {
        Self {
            light_dir: light.direction,
            half_vector: light.half_vector(basis.view_dir),
            ambient: light.ambient_intensity,
        }
    }
}

/// Blinn-Phong colour of a material under one directional light, unclamped.
///
/// ```text
/// ambient  = base * ambient
/// diffuse  = base * (1 - metallic) * max(N.L, 0)
/// specular = mix(white, base, metallic) * max(N.H, 0)^shininess * (1 - 0.7 * roughness)
/// emitted  = base * emission
/// ```
pub fn shade_material(material: &Material, normal: Vec3, setup: &ShadingSetup) -> Vec3 {
    let base = material.color;
    let n_dot_l = normal.dot(setup.light_dir).max(0.0);
    let n_dot_h = normal.dot(setup.half_vector).max(0.0);
    let spec = n_dot_h.powf(material.shininess());

    let diffuse = base * ((1.0 - material.metallic) * n_dot_l);
    let spec_color = base * material.metallic + Vec3::splat(1.0 - material.metallic);
    let specular = spec_color * (spec * (1.0 - material.roughness * 0.7));
    let ambient = base * setup.ambient;
    let emitted = base * material.emission;

    ambient + diffuse + specular + emitted
}

/// Flat material shading: one lit colour per triangle, computed up front
/// from the face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialShader {
    color: u32,
}

impl MaterialShader {
    pub fn new(material: &Material, normal: Vec3, setup: &ShadingSetup) -> Self {
        Self {
            color: pack_rgb(shade_material(material, normal, setup)),
        }
    }

    pub fn color(&self) -> u32 {
        self.color
    }
}

impl PixelShader for MaterialShader {
    #[inline]
    fn shade(&self, _lambda: [f32; 3]) -> u32 {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn setup_from_above() -> ShadingSetup {
        ShadingSetup {
            light_dir: Vec3::UP,
            half_vector: Vec3::UP,
            ambient: 0.1,
        }
    }

    #[test]
    fn facing_away_leaves_only_ambient() {
        let material = Material::new(Vec3::new(1.0, 0.5, 0.0), 0.5, 0.0, 0.0);
        let c = shade_material(&material, -Vec3::UP, &setup_from_above());
        assert_relative_eq!(c.x, 0.1);
        assert_relative_eq!(c.y, 0.05, epsilon = 1e-6);
        assert_relative_eq!(c.z, 0.0);
    }

    #[test]
    fn metallic_surface_has_no_diffuse() {
        let metal = Material::new(Vec3::new(0.5, 0.5, 0.5), 1.0, 1.0, 0.0);
        let setup = ShadingSetup {
            half_vector: Vec3::RIGHT,
            ..setup_from_above()
        };
        // N.H = 0, so only ambient remains even though N.L = 1.
        let c = shade_material(&metal, Vec3::UP, &setup);
        assert_relative_eq!(c.x, 0.05, epsilon = 1e-6);
    }

    #[test]
    fn head_on_highlight_is_white_for_dielectrics() {
        let material = Material::new(Vec3::ZERO, 0.0, 0.0, 0.0);
        let c = shade_material(&material, Vec3::UP, &setup_from_above());
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.z, 1.0);
    }

    #[test]
    fn emission_adds_base_colour() {
        let glowing = Material::new(Vec3::new(0.2, 0.0, 0.0), 0.5, 0.0, 1.0);
        let plain = Material::new(Vec3::new(0.2, 0.0, 0.0), 0.5, 0.0, 0.0);
        let setup = setup_from_above();
        let delta = shade_material(&glowing, -Vec3::UP, &setup).x
            - shade_material(&plain, -Vec3::UP, &setup).x;
        assert_relative_eq!(delta, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn shader_packs_clamped_opaque_colour() {
        let material = Material::new(Vec3::ONE, 0.0, 0.0, 0.0);
        let shader = MaterialShader::new(&material, Vec3::UP, &setup_from_above());
        assert_eq!(shader.shade([1.0, 0.0, 0.0]), 0xFFFF_FFFF);
    }
}
