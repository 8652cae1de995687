//! The demo scene: a ground slab under a 10x10 grid of tumbling cubes.

use crate::error::RenderError;
use crate::material::MaterialPalette;
use crate::math::Vec3;
use crate::scene::SceneObject;
use crate::transform::Transform;

const COLS: usize = 10;
const ROWS: usize = 10;
const CUBE_COUNT: usize = COLS * ROWS;
const SPACING_X: f32 = 1.1;
const SPACING_Z: f32 = 1.3;
const START_Z: f32 = 9.0;
const CUBE_Y: f32 = 0.2;
const CUBE_SCALE: f32 = 0.65;
const GROUND_Y: f32 = -1.25;

/// Index of the ground slab in the scene returned by [`build_demo_scene`].
pub const GROUND_INDEX: usize = 0;

fn start_x() -> f32 {
    -((COLS - 1) as f32 * SPACING_X) * 0.5
}

/// Resting position of cube `i` on the grid.
fn grid_position(i: usize) -> (f32, f32) {
    let (ix, iz) = (i % COLS, i / COLS);
    (
        start_x() + ix as f32 * SPACING_X,
        START_Z + iz as f32 * SPACING_Z,
    )
}

/// Builds the ground and the cube grid, appending their materials to
/// `palette`. The ground is object [`GROUND_INDEX`].
pub fn build_demo_scene(palette: &mut MaterialPalette) -> Result<Vec<SceneObject>, RenderError> {
    let mut objects = Vec::with_capacity(1 + CUBE_COUNT);

    let ground = Transform::new(
        Vec3::new(0.0, GROUND_Y, 15.0),
        Vec3::ZERO,
        Vec3::new(40.0, 0.2, 40.0),
    );
    objects.push(SceneObject::cube(
        ground,
        Vec3::new(0.32, 0.34, 0.38),
        palette,
    )?);

    for i in 0..CUBE_COUNT {
        let tx = (i % COLS) as f32 / (COLS - 1) as f32;
        let tz = (i / COLS) as f32 / (ROWS - 1) as f32;
        let (x, z) = grid_position(i);

        let color = Vec3::new(
            0.2 + 0.7 * tx,
            0.15 + 0.7 * (1.0 - tz),
            0.3 + 0.6 * (1.0 - tx),
        );
        let rotation = Vec3::new(
            (i % 5) as f32 * 0.628,
            (i % 7) as f32 * 0.449,
            (i % 3) as f32 * 0.524,
        );
        let transform = Transform::new(Vec3::new(x, CUBE_Y, z), rotation, Vec3::splat(CUBE_SCALE));
        objects.push(SceneObject::cube(transform, color, palette)?);
    }

    log::debug!("demo scene: {} objects", objects.len());
    Ok(objects)
}

/// Spins and bobs every cube for `frame` and refreshes their world bounds.
/// The ground (and anything past the cube grid) is left alone.
pub fn animate_demo_scene(objects: &mut [SceneObject], frame: u64) {
    let cubes = objects.iter_mut().skip(GROUND_INDEX + 1).take(CUBE_COUNT);
    for (i, cube) in cubes.enumerate() {
        let (ix, iz) = (i % COLS, i / COLS);
        let (base_x, base_z) = grid_position(i);

        cube.transform.rotate(Vec3::new(
            0.005 + 0.001 * (i % 3) as f32,
            0.018 + 0.002 * (i % 7) as f32,
            0.0,
        ));

        let orbit = frame as f32 * (0.006 + 0.0008 * (i % 11) as f32);
        cube.transform.set_position(Vec3::new(
            base_x + 0.2 * (orbit + ix as f32).sin(),
            CUBE_Y + 0.2 * (orbit * 0.5 + i as f32 * 0.3).sin(),
            base_z + 0.2 * (orbit * 0.7 + iz as f32).cos(),
        ));
        cube.update_world_bounds();
    }
}
