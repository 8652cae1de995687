//! Renderable objects.
//!
//! A [`SceneObject`] owns its triangles in local space together with a
//! [`Transform`] and two bounding boxes: the local box enclosing the vertices
//! and a world-space box derived from it. The world box is what the shadow
//! and reflection stage tests rays against, so it must be refreshed with
//! [`SceneObject::update_world_bounds`] whenever the transform changes.

use std::path::Path;

use crate::colors;
use crate::error::RenderError;
use crate::material::{Material, MaterialId, MaterialPalette};
use crate::math::{Aabb, Vec3};
use crate::transform::Transform;

/// One local-space triangle with a flat shading normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTriangle {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
    pub material: MaterialId,
}

impl SceneTriangle {
    pub fn new(vertices: [Vec3; 3], normal: Vec3, material: MaterialId) -> Self {
        Self {
            vertices,
            normal,
            material,
        }
    }

    /// Builds a triangle whose normal follows the winding `(b - a) x (c - a)`.
    /// Returns `None` for a zero-area triangle.
    pub fn from_winding(vertices: [Vec3; 3], material: MaterialId) -> Option<Self> {
        let [a, b, c] = vertices;
        let n = (b - a).cross(c - a);
        if n.length_squared() <= f32::EPSILON * f32::EPSILON {
            return None;
        }
        Some(Self::new(vertices, n.normalize(), material))
    }
}

/// Triangles, placement and bounding volumes of one object.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub transform: Transform,
    triangles: Vec<SceneTriangle>,
    local_bounds: Aabb,
    world_bounds: Aabb,
    /// Colour seen in reflections that hit this object's box.
    pub proxy_color: u32,
}

impl SceneObject {
    pub fn new(transform: Transform, triangles: Vec<SceneTriangle>, proxy_color: u32) -> Self {
        let local_bounds =
            Aabb::from_points(triangles.iter().flat_map(|t| t.vertices.iter().copied()));
        let mut object = Self {
            transform,
            triangles,
            local_bounds,
            world_bounds: Aabb::EMPTY,
            proxy_color,
        };
        object.update_world_bounds();
        object
    }

    /// Unit cube centred on the origin, one material for all twelve faces.
    ///
    /// The material is appended to `palette`; the cube's reflection proxy
    /// colour is its base colour.
    pub fn cube(
        transform: Transform,
        color: Vec3,
        palette: &mut MaterialPalette,
    ) -> Result<Self, RenderError> {
        let material = palette.push(Material::new(color, 0.5, 0.0, 0.0))?;
        Ok(Self::new(
            transform,
            cube_triangles(material),
            colors::pack_rgb(color),
        ))
    }

    /// Loads every model of a Wavefront OBJ file as one object.
    ///
    /// Faces are triangulated by `tobj`; normals are taken from the winding.
    /// All triangles share `material`.
    pub fn from_obj<P: AsRef<Path>>(
        path: P,
        transform: Transform,
        material: MaterialId,
        proxy_color: u32,
    ) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| RenderError::MeshLoad {
            path: path.display().to_string(),
            source,
        })?;

        let mut triangles = Vec::new();
        for model in &models {
            let positions = &model.mesh.positions;
            let vertex = |i: u32| {
                let i = i as usize * 3;
                Vec3::new(positions[i], positions[i + 1], positions[i + 2])
            };
            for face in model.mesh.indices.chunks_exact(3) {
                let corners = [vertex(face[0]), vertex(face[1]), vertex(face[2])];
                if let Some(tri) = SceneTriangle::from_winding(corners, material) {
                    triangles.push(tri);
                }
            }
        }

        if triangles.is_empty() {
            return Err(RenderError::EmptyMesh(path.display().to_string()));
        }
        log::debug!(
            "loaded {} triangles from {} ({} models)",
            triangles.len(),
            path.display(),
            models.len()
        );
        Ok(Self::new(transform, triangles, proxy_color))
    }

    pub fn triangles(&self) -> &[SceneTriangle] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn local_bounds(&self) -> Aabb {
        self.local_bounds
    }

    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    /// Recomputes the world box from the eight transformed local corners.
    pub fn update_world_bounds(&mut self) {
        self.world_bounds = self
            .local_bounds
            .transformed(&self.transform.world_matrix());
    }
}

/// Total triangle count of a scene.
pub fn count_triangles(objects: &[SceneObject]) -> usize {
    objects.iter().map(SceneObject::triangle_count).sum()
}

fn cube_triangles(material: MaterialId) -> Vec<SceneTriangle> {
    const V: [Vec3; 8] = [
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
    ];
    // (a, b, c, outward normal); two triangles per face.
    let faces: [(usize, usize, usize, Vec3); 12] = [
        (4, 5, 6, Vec3::FORWARD),
        (4, 6, 7, Vec3::FORWARD),
        (1, 0, 3, -Vec3::FORWARD),
        (1, 3, 2, -Vec3::FORWARD),
        (0, 4, 7, -Vec3::RIGHT),
        (0, 7, 3, -Vec3::RIGHT),
        (5, 1, 2, Vec3::RIGHT),
        (5, 2, 6, Vec3::RIGHT),
        (3, 7, 6, Vec3::UP),
        (3, 6, 2, Vec3::UP),
        (0, 1, 5, -Vec3::UP),
        (0, 5, 4, -Vec3::UP),
    ];
    faces
        .iter()
        .map(|&(a, b, c, n)| SceneTriangle::new([V[a], V[b], V[c]], n, material))
        .collect()
}
