//! Screen-space shadows and reflections from bounding-box occluders.
//!
//! Instead of tracing triangles, every object is represented by its
//! world-space [`Aabb`]. The stage walks the frame on a coarse grid, casts a
//! shadow ray toward the light and a reflection ray along the stored
//! reflection direction from each upward-facing grid point, and writes the
//! result into the whole `stride` x `stride` block around it.
//!
//! The expensive part only runs every `recompute_interval` frames. The
//! blurred mask and the reflection colours are cached in the
//! [`FrameContext`] and composited into the color buffer on every frame in
//! between, so the effects lag moving objects by up to the interval.

use crate::colors;
use crate::math::{Aabb, Ray, Vec3};
use crate::render::blur::separable_box_blur;
use crate::render::frame::{has_depth, FrameContext, GBuffer, ShadowRows, UPWARD_THRESHOLD};
use crate::scene::SceneObject;
use crate::scheduler::{run_bands, WorkerPool};

/// Offset along the surface normal applied to ray origins.
pub const SHADOW_BIAS: f32 = 0.01;

/// Tuning for [`post_process`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Grid step in pixels. Zero is treated as one.
    pub stride: usize,
    /// Recompute every N frames. Zero is treated as one.
    pub recompute_interval: u32,
    pub blur_radius: usize,
    /// Reflection colour for rays that miss every box.
    pub sky_color: u32,
    /// Rows per band when running on a pool; rounded up to a multiple of
    /// `stride` so grid blocks never straddle two bands.
    pub band_rows: usize,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            stride: 4,
            recompute_interval: 4,
            blur_radius: 5,
            sky_color: colors::SKY,
            band_rows: 16,
        }
    }
}

impl ShadowSettings {
    /// Copy with out-of-range values clamped, warning about each one.
    pub fn sanitized(mut self) -> Self {
        if self.stride == 0 {
            log::warn!("shadow stride 0 clamped to 1");
            self.stride = 1;
        }
        if self.recompute_interval == 0 {
            log::warn!("shadow recompute interval 0 clamped to 1");
            self.recompute_interval = 1;
        }
        self
    }

    fn grid_band_rows(&self) -> usize {
        let stride = self.stride.max(1);
        self.band_rows.max(1).div_ceil(stride) * stride
    }
}

/// Per-object data the rays are tested against.
#[derive(Debug, Clone, Copy)]
struct Occluder {
    bounds: Aabb,
    color: u32,
}

/// Updates the temporal shadow/reflection caches when due and composites
/// them into the color buffer.
///
/// Reads depth, normal, position and reflection planes; writes the shadow
/// scratch/cache, reflection cache and color planes. Returns whether the
/// caches were recomputed this call. An empty object list does nothing.
pub fn post_process(
    objects: &[SceneObject],
    frame: &mut FrameContext,
    settings: &ShadowSettings,
    pool: Option<&WorkerPool>,
) -> bool {
    if objects.is_empty() {
        return false;
    }
    let interval = u64::from(settings.recompute_interval.max(1));
    let due = frame.advance_frame_counter() % interval == 0;

    if due {
        let occluders: Vec<Occluder> = objects
            .iter()
            .map(|o| Occluder {
                bounds: o.world_bounds(),
                color: o.proxy_color,
            })
            .collect();
        recompute(&occluders, frame, settings, pool);
        log::trace!("shadow caches recomputed (frame {})", frame.frame_counter() - 1);
    } else {
        log::trace!("shadow caches reused");
    }

    composite(frame, pool, settings.band_rows);
    due
}

fn recompute(
    occluders: &[Occluder],
    frame: &mut FrameContext,
    settings: &ShadowSettings,
    pool: Option<&WorkerPool>,
) {
    let stride = settings.stride.max(1);
    let light_dir = frame.light.direction;
    let width = frame.width();

    let (gbuffer, bands) = frame.shadow_bands(settings.grid_band_rows());
    run_bands(pool, bands, |band| {
        trace_band(band, &gbuffer, occluders, light_dir, stride, settings.sky_color)
    });

    let (mask, scratch) = frame.blur_targets();
    separable_box_blur(
        mask,
        scratch,
        width,
        settings.blur_radius,
        pool,
        settings.band_rows,
    );
    frame.swap_shadow_cache();
}

fn trace_band(
    band: ShadowRows<'_>,
    gbuffer: &GBuffer<'_>,
    occluders: &[Occluder],
    light_dir: Vec3,
    stride: usize,
    sky_color: u32,
) {
    let ShadowRows {
        y0,
        rows,
        mask,
        reflect_cache,
    } = band;
    mask.fill(1.0);
    reflect_cache.fill(0);

    let width = gbuffer.width;
    let receives = |idx: usize| {
        has_depth(gbuffer.depth[idx]) && gbuffer.normal[idx].y >= UPWARD_THRESHOLD
    };

    for gy in (0..rows).step_by(stride) {
        for gx in (0..width).step_by(stride) {
            let idx = (y0 + gy) * width + gx;
            if !receives(idx) {
                continue;
            }

            let normal = gbuffer.normal[idx];
            let origin = gbuffer.position[idx] + normal * SHADOW_BIAS;

            let shadow_ray = Ray::new(origin, light_dir);
            let in_shadow = occluders.iter().any(|o| o.bounds.hit(&shadow_ray));

            let reflect_ray = Ray::new(origin, gbuffer.reflect[idx]);
            let reflected = nearest_hit_color(occluders, &reflect_ray).unwrap_or(sky_color);

            let block_rows = stride.min(rows - gy);
            let block_cols = stride.min(width - gx);
            for dy in 0..block_rows {
                for dx in 0..block_cols {
                    let local = (gy + dy) * width + gx + dx;
                    if !receives((y0 + gy + dy) * width + gx + dx) {
                        continue;
                    }
                    if in_shadow {
                        mask[local] = 0.0;
                    }
                    reflect_cache[local] = reflected;
                }
            }
        }
    }
}

/// Colour of the box whose entry distance along `ray` is smallest.
fn nearest_hit_color(occluders: &[Occluder], ray: &Ray) -> Option<u32> {
    occluders
        .iter()
        .filter_map(|o| o.bounds.intersect(ray).map(|(t_min, _)| (t_min, o.color)))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, color)| color)
}

/// Blends cached reflections and applies the cached shadow mask.
fn composite(frame: &mut FrameContext, pool: Option<&WorkerPool>, band_rows: usize) {
    let width = frame.width();
    let chunk = band_rows.max(1) * width;
    let (color, shadow, reflect) = frame.composite_targets();

    let bands: Vec<_> = color
        .chunks_mut(chunk)
        .zip(shadow.chunks(chunk))
        .zip(reflect.chunks(chunk))
        .collect();
    run_bands(pool, bands, |((color, shadow), reflect)| {
        for ((c, &s), &r) in color.iter_mut().zip(shadow).zip(reflect) {
            let base = if r != 0 { colors::blend_half(*c, r) } else { *c };
            *c = colors::darken(base, s);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::light::DirectionalLight;
    use crate::material::MaterialPalette;
    use crate::transform::Transform;

    fn cube_at(position: Vec3, scale: Vec3, palette: &mut MaterialPalette) -> SceneObject {
        SceneObject::cube(
            Transform::new(position, Vec3::ZERO, scale),
            Vec3::splat(0.5),
            palette,
        )
        .unwrap()
    }

    /// A frame whose G-buffer is a flat floor at y = 0 facing up.
    fn floor_frame(width: u32, height: u32) -> FrameContext {
        let mut frame = FrameContext::new(
            width,
            height,
            Camera::default(),
            DirectionalLight::new(Vec3::UP),
        )
        .unwrap();
        let w = width as usize;
        let mut rows = frame.gbuffer_rows();
        for (i, ((d, n), p)) in rows
            .depth
            .iter_mut()
            .zip(rows.normal.iter_mut())
            .zip(rows.position.iter_mut())
            .enumerate()
        {
            *d = 5.0;
            *n = Vec3::UP;
            *p = Vec3::new((i % w) as f32 * 0.1, 0.0, (i / w) as f32 * 0.1);
        }
        rows.reflect.fill(Vec3::UP);
        rows.color.fill(0xFF80_8080);
        frame
    }

    #[test]
    fn grid_bands_align_to_stride() {
        let settings = ShadowSettings {
            stride: 3,
            band_rows: 16,
            ..ShadowSettings::default()
        };
        assert_eq!(settings.grid_band_rows(), 18);
    }

    #[test]
    fn sanitized_clamps_zero_values() {
        let settings = ShadowSettings {
            stride: 0,
            recompute_interval: 0,
            ..ShadowSettings::default()
        }
        .sanitized();
        assert_eq!(settings.stride, 1);
        assert_eq!(settings.recompute_interval, 1);
    }

    #[test]
    fn empty_scene_is_a_no_op() {
        let mut frame = floor_frame(8, 8);
        let recomputed = post_process(&[], &mut frame, &ShadowSettings::default(), None);
        assert!(!recomputed);
        assert_eq!(frame.frame_counter(), 0);
        assert!(frame.color().iter().all(|&c| c == 0xFF80_8080));
    }

    #[test]
    fn unoccluded_floor_stays_lit() {
        let mut palette = MaterialPalette::new();
        // Far off to the side: neither the light ray nor the reflection ray hits it.
        let far = cube_at(Vec3::new(100.0, 0.0, 100.0), Vec3::ONE, &mut palette);
        let mut frame = floor_frame(16, 12);
        assert!(post_process(&[far], &mut frame, &ShadowSettings::default(), None));
        assert!(frame.shadow_cache().iter().all(|&s| s == 1.0));
        assert!(frame.reflect_cache().iter().all(|&c| c == colors::SKY));
    }

    #[test]
    fn box_overhead_shadows_the_floor() {
        let mut palette = MaterialPalette::new();
        // Covers the whole 1.6 x 1.2 floor patch from above.
        let roof = cube_at(Vec3::new(0.8, 3.0, 0.6), Vec3::new(4.0, 0.5, 4.0), &mut palette);
        let mut frame = floor_frame(16, 12);
        let settings = ShadowSettings {
            blur_radius: 1,
            ..ShadowSettings::default()
        };
        post_process(&[roof], &mut frame, &settings, None);
        assert!(frame.shadow_cache().iter().all(|&s| s == 0.0));
        // Fully shadowed pixels are darkened to half.
        let c = frame.color()[0];
        assert!((c & 0xFF) < 0x80);
    }

    #[test]
    fn recompute_runs_on_interval() {
        let mut palette = MaterialPalette::new();
        let far = cube_at(Vec3::new(100.0, 0.0, 100.0), Vec3::ONE, &mut palette);
        let objects = [far];
        let mut frame = floor_frame(8, 8);
        let settings = ShadowSettings {
            recompute_interval: 3,
            ..ShadowSettings::default()
        };
        let pattern: Vec<bool> = (0..7)
            .map(|_| post_process(&objects, &mut frame, &settings, None))
            .collect();
        assert_eq!(pattern, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn downward_facing_pixels_are_never_shadowed() {
        let mut palette = MaterialPalette::new();
        let roof = cube_at(Vec3::new(0.8, 3.0, 0.6), Vec3::new(4.0, 0.5, 4.0), &mut palette);
        let mut frame = floor_frame(8, 8);
        {
            let mut rows = frame.gbuffer_rows();
            rows.normal[..8].fill(-Vec3::UP);
        }
        let settings = ShadowSettings {
            stride: 1,
            blur_radius: 0,
            ..ShadowSettings::default()
        };
        post_process(&[roof], &mut frame, &settings, None);
        assert!(frame.shadow_cache()[..8].iter().all(|&s| s == 1.0));
        assert!(frame.shadow_cache()[8..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn grid_sample_only_writes_receiving_pixels_of_its_block() {
        let mut palette = MaterialPalette::new();
        let roof = cube_at(Vec3::new(0.8, 3.0, 0.6), Vec3::new(4.0, 0.5, 4.0), &mut palette);
        let mut frame = floor_frame(8, 8);
        {
            let mut rows = frame.gbuffer_rows();
            // Pixel 1 shares the block sampled at pixel 0; pixel 4 is the
            // sample of the next block.
            rows.normal[1] = Vec3::RIGHT;
            rows.normal[4] = Vec3::RIGHT;
        }
        let settings = ShadowSettings {
            stride: 4,
            blur_radius: 0,
            ..ShadowSettings::default()
        };
        post_process(&[roof], &mut frame, &settings, None);

        let mask = frame.shadow_cache();
        let reflect = frame.reflect_cache();
        assert_eq!(mask[0], 0.0);
        assert_eq!(mask[2], 0.0);
        assert_eq!(mask[1], 1.0);
        assert_eq!(reflect[1], 0);
        assert_ne!(reflect[0], 0);
        // A block whose sample does not receive keeps its defaults, even
        // for receiving pixels inside it.
        assert_eq!(mask[5], 1.0);
        assert_eq!(reflect[5], 0);
    }

    #[test]
    fn composite_blends_reflection_then_darkens() {
        let mut palette = MaterialPalette::new();
        let roof = cube_at(Vec3::new(0.8, 3.0, 0.6), Vec3::new(4.0, 0.5, 4.0), &mut palette);
        let roof_color = roof.proxy_color;
        let mut frame = floor_frame(8, 8);
        {
            let mut rows = frame.gbuffer_rows();
            rows.normal[3] = Vec3::RIGHT;
        }
        let settings = ShadowSettings {
            stride: 1,
            blur_radius: 0,
            ..ShadowSettings::default()
        };
        post_process(&[roof], &mut frame, &settings, None);

        let base = 0xFF80_8080;
        let expected = colors::darken(colors::blend_half(base, roof_color), 0.0);
        assert_eq!(frame.reflect_cache()[0], roof_color);
        assert_eq!(frame.color()[0], expected);
        // No reflection and fully lit: the colour passes through.
        assert_eq!(frame.color()[3], colors::darken(base, 1.0));
        assert_eq!(frame.color()[3], base);
    }

    #[test]
    fn nearest_box_wins_reflection() {
        let near = Occluder {
            bounds: Aabb::new(Vec3::new(-1.0, 2.0, -1.0), Vec3::new(1.0, 3.0, 1.0)),
            color: 0xFF00_00FF,
        };
        let far = Occluder {
            bounds: Aabb::new(Vec3::new(-1.0, 5.0, -1.0), Vec3::new(1.0, 6.0, 1.0)),
            color: 0xFFFF_0000,
        };
        let ray = Ray::new(Vec3::ZERO, Vec3::UP);
        assert_eq!(nearest_hit_color(&[far, near], &ray), Some(0xFF00_00FF));
    }

    #[test]
    fn pooled_post_process_matches_inline() {
        let mut palette = MaterialPalette::new();
        let roof = cube_at(Vec3::new(0.4, 3.0, 0.3), Vec3::new(0.6, 0.5, 0.6), &mut palette);
        let settings = ShadowSettings {
            stride: 3,
            band_rows: 4,
            blur_radius: 2,
            ..ShadowSettings::default()
        };

        let mut inline = floor_frame(20, 17);
        post_process(std::slice::from_ref(&roof), &mut inline, &settings, None);

        let pool = WorkerPool::new(4, 32).unwrap();
        let mut pooled = floor_frame(20, 17);
        post_process(std::slice::from_ref(&roof), &mut pooled, &settings, Some(&pool));

        assert_eq!(inline.shadow_cache(), pooled.shadow_cache());
        assert_eq!(inline.color(), pooled.color());
    }
}
