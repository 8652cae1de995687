//! Triangle rasterization into the G-buffer.
//!
//! Rasterization runs in two steps. [`prepare_object`] transforms an object
//! to world space, culls back faces and triangles entirely behind the near
//! plane, projects the rest and shades them, producing [`ScreenTriangle`]s.
//! [`ScreenTriangle::rasterize`] then fills one band of rows.
//!
//! The parallel path prepares every triangle of the scene once and hands each
//! worker a disjoint band of rows; every band visits the triangles in scene
//! order, so each pixel sees the same sequence of depth tests as in the
//! serial path and the two produce identical buffers.

mod edgefunction;
mod shader;

pub use edgefunction::ScreenTriangle;
pub use shader::{shade_material, MaterialShader, PixelShader, ShadingSetup};

use crate::camera::{CameraBasis, NEAR_PLANE};
use crate::light::DirectionalLight;
use crate::material::MaterialPalette;
use crate::render::frame::FrameContext;
use crate::scene::SceneObject;
use crate::scheduler::{run_bands, WorkerPool};

/// Appends the visible triangles of `object` to `out`, ready to rasterize
/// into a `width` x `height` target.
pub fn prepare_object(
    object: &SceneObject,
    palette: &MaterialPalette,
    basis: &CameraBasis,
    light: &DirectionalLight,
    width: usize,
    height: usize,
    out: &mut Vec<ScreenTriangle<MaterialShader>>,
) {
    if object.triangle_count() == 0 {
        return;
    }
    let world = object.transform.world_matrix();
    let normals = object.transform.normal_matrix();
    let setup = ShadingSetup::new(light, basis);

    for tri in object.triangles() {
        let v = tri.vertices.map(|p| world * p);
        let normal = normals.transform_direction(tri.normal).normalize();

        if normal.dot(basis.position - v[0]) <= 0.0 {
            continue;
        }

        let z = v.map(|p| basis.view_depth(p));
        if z.iter().all(|&z| z <= NEAR_PLANE) {
            continue;
        }

        let screen = [
            basis.project(v[0], z[0]),
            basis.project(v[1], z[1]),
            basis.project(v[2], z[2]),
        ];
        let shader = MaterialShader::new(palette.get(tri.material), normal, &setup);
        if let Some(prepared) = ScreenTriangle::new(v, screen, z, normal, width, height, shader) {
            out.push(prepared);
        }
    }
}

/// Rasterizes one object with the frame's current camera basis.
///
/// Returns the number of triangles that reached the pixel loop.
pub fn render_object(object: &SceneObject, palette: &MaterialPalette, frame: &mut FrameContext) -> usize {
    let basis = *frame.basis();
    let light = frame.light;
    let mut triangles = Vec::with_capacity(object.triangle_count());
    prepare_object(
        object,
        palette,
        &basis,
        &light,
        frame.width(),
        frame.height(),
        &mut triangles,
    );

    let mut rows = frame.gbuffer_rows();
    for tri in &triangles {
        tri.rasterize(basis.position, &mut rows);
    }
    triangles.len()
}

/// Refreshes the camera basis, then rasterizes every object in order.
pub fn render_objects(
    objects: &[SceneObject],
    palette: &MaterialPalette,
    frame: &mut FrameContext,
) -> usize {
    if objects.is_empty() {
        return 0;
    }
    frame.prepare();
    objects
        .iter()
        .map(|object| render_object(object, palette, frame))
        .sum()
}

/// Like [`render_objects`], but rasterizes bands of `band_rows` rows on
/// `pool`. Output is identical to the serial path.
pub fn render_objects_parallel(
    objects: &[SceneObject],
    palette: &MaterialPalette,
    frame: &mut FrameContext,
    pool: &WorkerPool,
    band_rows: usize,
) -> usize {
    if objects.is_empty() {
        return 0;
    }
    frame.prepare();
    let basis = *frame.basis();
    let light = frame.light;
    let (width, height) = (frame.width(), frame.height());

    let mut triangles = Vec::with_capacity(crate::scene::count_triangles(objects));
    for object in objects {
        prepare_object(object, palette, &basis, &light, width, height, &mut triangles);
    }

    let eye = basis.position;
    let prepared = &triangles;
    run_bands(Some(pool), frame.gbuffer_bands(band_rows), |mut band| {
        for tri in prepared {
            tri.rasterize(eye, &mut band);
        }
    });
    log::trace!(
        "rasterized {} triangles in bands of {} rows",
        triangles.len(),
        band_rows
    );
    triangles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::colors;
    use crate::math::Vec3;
    use crate::render::frame::DEPTH_EMPTY;
    use crate::transform::Transform;

    fn frame(width: u32, height: u32) -> FrameContext {
        let camera = Camera::new(Vec3::ZERO, Vec3::FORWARD, 60.0);
        FrameContext::new(width, height, camera, DirectionalLight::default()).unwrap()
    }

    fn cube(position: Vec3, palette: &mut MaterialPalette) -> SceneObject {
        let transform = Transform::new(position, Vec3::ZERO, Vec3::ONE);
        SceneObject::cube(transform, Vec3::new(0.8, 0.3, 0.2), palette).unwrap()
    }

    #[test]
    fn only_camera_facing_triangles_survive() {
        let mut palette = MaterialPalette::new();
        let object = cube(Vec3::new(0.0, 0.0, 5.0), &mut palette);
        let mut f = frame(64, 48);
        f.prepare();
        // Looking straight at the cube only its -z face is visible.
        assert_eq!(render_object(&object, &palette, &mut f), 2);
        assert!(f.depth().iter().any(|&d| d != DEPTH_EMPTY));
    }

    #[test]
    fn object_behind_camera_writes_nothing() {
        let mut palette = MaterialPalette::new();
        let objects = vec![cube(Vec3::new(0.0, 0.0, -5.0), &mut palette)];
        let mut f = frame(64, 48);
        f.clear(colors::BLACK);
        assert_eq!(render_objects(&objects, &palette, &mut f), 0);
        assert!(f.depth().iter().all(|&d| d == DEPTH_EMPTY));
        assert!(f.color().iter().all(|&c| c == colors::BLACK));
    }

    #[test]
    fn empty_scene_is_a_no_op() {
        let palette = MaterialPalette::new();
        let mut f = frame(8, 8);
        assert_eq!(render_objects(&[], &palette, &mut f), 0);
        assert!(f.depth().iter().all(|&d| d == DEPTH_EMPTY));
    }

    #[test]
    fn nearer_cube_occludes_farther_one() {
        let mut palette = MaterialPalette::new();
        let near = cube(Vec3::new(0.0, 0.0, 4.0), &mut palette);
        let far = SceneObject::cube(
            Transform::new(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, Vec3::splat(3.0)),
            Vec3::new(0.1, 0.9, 0.1),
            &mut palette,
        )
        .unwrap();

        let mut a = frame(64, 48);
        render_objects(&[near.clone(), far.clone()], &palette, &mut a);
        let mut b = frame(64, 48);
        render_objects(&[far, near], &palette, &mut b);

        assert_eq!(a.color(), b.color());
        let center = 24 * 64 + 32;
        assert!(a.depth()[center] < 4.0);
    }

    #[test]
    fn parallel_matches_serial() {
        let mut palette = MaterialPalette::new();
        let objects: Vec<SceneObject> = (0..6)
            .map(|i| {
                let t = Transform::new(
                    Vec3::new(i as f32 - 2.5, 0.3 * i as f32 - 1.0, 6.0 + i as f32),
                    Vec3::new(0.4 * i as f32, 0.7, 0.2),
                    Vec3::splat(1.2),
                );
                SceneObject::cube(t, Vec3::new(0.2, 0.5, 0.1 * i as f32), &mut palette).unwrap()
            })
            .collect();

        let mut serial = frame(96, 64);
        let serial_count = render_objects(&objects, &palette, &mut serial);

        let pool = WorkerPool::new(4, 64).unwrap();
        let mut banded = frame(96, 64);
        let banded_count = render_objects_parallel(&objects, &palette, &mut banded, &pool, 7);

        assert_eq!(serial_count, banded_count);
        assert_eq!(serial.color(), banded.color());
        assert_eq!(serial.depth(), banded.depth());
        assert_eq!(serial.normals(), banded.normals());
        assert_eq!(serial.reflections(), banded.reflections());
    }
}
