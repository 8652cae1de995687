//! Surface materials and the append-only palette triangles index into.

use crate::error::RenderError;
use crate::math::Vec3;

/// Index of a [`Material`] inside a [`MaterialPalette`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Blinn-Phong style surface description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Base colour, channels in `[0, 1]`.
    pub color: Vec3,
    /// 0 = mirror-sharp highlight, 1 = broad dull highlight.
    pub roughness: f32,
    /// 0 = dielectric, 1 = metal (no diffuse, tinted specular).
    pub metallic: f32,
    /// Self-illumination added on top of the lit colour, scaled by `color`.
    pub emission: f32,
}

impl Material {
    /// Neutral grey returned for ids that are not in the palette.
    pub const DEFAULT: Self = Self {
        color: Vec3::splat(0.8),
        roughness: 0.5,
        metallic: 0.0,
        emission: 0.0,
    };

    pub const fn new(color: Vec3, roughness: f32, metallic: f32, emission: f32) -> Self {
        Self {
            color,
            roughness,
            metallic,
            emission,
        }
    }

    /// Specular exponent derived from roughness.
    #[inline]
    pub fn shininess(&self) -> f32 {
        (1.0 - self.roughness) * 128.0 + 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Append-only material table.
///
/// Materials are never removed, so a [`MaterialId`] handed out once stays
/// valid for the palette's lifetime.
#[derive(Clone, Debug, Default)]
pub struct MaterialPalette {
    entries: Vec<Material>,
}

impl MaterialPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a material and returns its id.
    pub fn push(&mut self, material: Material) -> Result<MaterialId, RenderError> {
        let id = u32::try_from(self.entries.len()).map_err(|_| RenderError::Allocation {
            what: "material palette",
            bytes: std::mem::size_of::<Material>(),
        })?;
        self.entries
            .try_reserve(1)
            .map_err(|_| RenderError::Allocation {
                what: "material palette",
                bytes: std::mem::size_of::<Material>(),
            })?;
        self.entries.push(material);
        Ok(MaterialId(id))
    }

    /// Looks up a material. Unknown ids resolve to [`Material::DEFAULT`].
    #[inline]
    pub fn get(&self, id: MaterialId) -> &Material {
        self.entries
            .get(id.0 as usize)
            .unwrap_or(&Material::DEFAULT)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn push_returns_sequential_ids() {
        let mut palette = MaterialPalette::new();
        let a = palette.push(Material::DEFAULT).unwrap();
        let b = palette.push(Material::new(Vec3::ONE, 0.1, 1.0, 0.0)).unwrap();
        assert_eq!(a, MaterialId(0));
        assert_eq!(b, MaterialId(1));
        assert_eq!(palette.len(), 2);
        assert_relative_eq!(palette.get(b).metallic, 1.0);
    }

    #[test]
    fn unknown_id_falls_back_to_default() {
        let palette = MaterialPalette::new();
        assert_eq!(*palette.get(MaterialId(42)), Material::DEFAULT);
    }

    #[test]
    fn shininess_spans_one_to_one_twenty_nine() {
        let sharp = Material::new(Vec3::ONE, 0.0, 0.0, 0.0);
        let dull = Material::new(Vec3::ONE, 1.0, 0.0, 0.0);
        assert_relative_eq!(sharp.shininess(), 129.0);
        assert_relative_eq!(dull.shininess(), 1.0);
    }
}
