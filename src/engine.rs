//! Core rendering engine.
//!
//! The [`Engine`] struct is the main entry point for the renderer. It owns the
//! frame buffers, the scene, the material palette and (optionally) the worker
//! pool, and runs the per-frame pipeline:
//!
//! ```text
//! jitter → clear → rasterize (serial or banded) → barrier → shadows/reflections → debug view
//! ```

use std::time::{Duration, Instant};

use crate::config::RenderConfig;
use crate::demo;
use crate::error::RenderError;
use crate::material::MaterialPalette;
use crate::render::frame::{DebugView, FrameContext};
use crate::render::rasterizer::{render_objects, render_objects_parallel};
use crate::render::shadow::{post_process, ShadowSettings};
use crate::scene::{count_triangles, SceneObject};
use crate::scheduler::WorkerPool;

/// Timings and counters of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub clear: Duration,
    pub raster: Duration,
    pub shadow: Duration,
    /// Triangles that survived culling and reached the pixel loop.
    pub triangles: usize,
    /// Whether the shadow/reflection caches were recomputed.
    pub recomputed: bool,
    pub parallel: bool,
}

impl FrameStats {
    pub fn total(&self) -> Duration {
        self.clear + self.raster + self.shadow
    }
}

pub struct Engine {
    frame: FrameContext,
    objects: Vec<SceneObject>,
    palette: MaterialPalette,
    pool: Option<WorkerPool>,
    pool_enabled: bool,
    workers: usize,
    queue_capacity: usize,
    band_rows: usize,
    shadow: ShadowSettings,
    clear_color: u32,
    temporal_jitter: bool,
    debug_view: DebugView,
    frames_rendered: u64,
}

impl Engine {
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let frame = FrameContext::new(config.width, config.height, config.camera(), config.light())?;
        let pool = if config.use_pool {
            Some(WorkerPool::new(config.workers, config.queue_capacity)?)
        } else {
            None
        };

        let shadow = ShadowSettings {
            stride: config.shadow_stride as usize,
            recompute_interval: config.recompute_interval,
            blur_radius: config.blur_radius as usize,
            sky_color: config.sky_color,
            band_rows: config.band_rows,
        }
        .sanitized();

        log::info!(
            "engine {}x{}, pool: {}",
            config.width,
            config.height,
            pool.as_ref()
                .map_or_else(|| "off".to_string(), |p| format!("{} workers", p.worker_count()))
        );

        Ok(Self {
            frame,
            objects: Vec::new(),
            palette: MaterialPalette::new(),
            pool_enabled: pool.is_some(),
            pool,
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            band_rows: config.band_rows.max(1),
            shadow,
            clear_color: config.clear_color,
            temporal_jitter: config.temporal_jitter,
            debug_view: DebugView::default(),
            frames_rendered: 0,
        })
    }

    /// Replaces the scene with the demo ground and cube grid.
    pub fn load_demo_scene(&mut self) -> Result<(), RenderError> {
        self.palette = MaterialPalette::new();
        self.objects = demo::build_demo_scene(&mut self.palette)?;
        self.frame.reset_temporal();
        log::info!(
            "demo scene loaded: {} objects, {} triangles",
            self.objects.len(),
            count_triangles(&self.objects)
        );
        Ok(())
    }

    /// Advances the demo animation to `frame`.
    pub fn animate_demo_scene(&mut self, frame: u64) {
        demo::animate_demo_scene(&mut self.objects, frame);
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Transforms may be changed freely; call
    /// [`SceneObject::update_world_bounds`] afterwards.
    pub fn objects_mut(&mut self) -> &mut Vec<SceneObject> {
        &mut self.objects
    }

    pub fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut MaterialPalette {
        &mut self.palette
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameContext {
        &mut self.frame
    }

    pub fn width(&self) -> u32 {
        self.frame.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.frame.height() as u32
    }

    /// Reallocates the frame for a new size. Camera and light are kept; the
    /// temporal caches start over.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.frame = FrameContext::new(width, height, self.frame.camera, self.frame.light)?;
        log::debug!("resized to {width}x{height}");
        Ok(())
    }

    pub fn shadow_settings(&self) -> &ShadowSettings {
        &self.shadow
    }

    pub fn set_shadow_stride(&mut self, stride: usize) {
        self.shadow = ShadowSettings {
            stride,
            ..self.shadow
        }
        .sanitized();
        // Blocks of the old size would linger until the next recompute.
        self.frame.reset_temporal();
        log::info!("shadow stride {}", self.shadow.stride);
    }

    pub fn set_recompute_interval(&mut self, interval: u32) {
        self.shadow = ShadowSettings {
            recompute_interval: interval,
            ..self.shadow
        }
        .sanitized();
    }

    pub fn pool_enabled(&self) -> bool {
        self.pool_enabled
    }

    /// Switches between pooled and single-threaded rendering, starting the
    /// pool the first time it is needed. Returns the new state.
    pub fn toggle_pool(&mut self) -> Result<bool, RenderError> {
        if !self.pool_enabled && self.pool.is_none() {
            self.pool = Some(WorkerPool::new(self.workers, self.queue_capacity)?);
        }
        self.pool_enabled = !self.pool_enabled;
        log::info!("worker pool {}", if self.pool_enabled { "on" } else { "off" });
        Ok(self.pool_enabled)
    }

    pub fn debug_view(&self) -> DebugView {
        self.debug_view
    }

    pub fn set_debug_view(&mut self, view: DebugView) {
        self.debug_view = view;
    }

    pub fn cycle_debug_view(&mut self) -> DebugView {
        self.debug_view = self.debug_view.next();
        log::info!("debug view: {}", self.debug_view);
        self.debug_view
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Renders one frame into the color buffer.
    pub fn render(&mut self) -> FrameStats {
        let pool = if self.pool_enabled {
            self.pool.as_ref()
        } else {
            None
        };

        let start = Instant::now();
        if self.temporal_jitter {
            self.frame.camera.set_jitter_for_frame(self.frames_rendered);
        }
        self.frame.clear(self.clear_color);
        let cleared = Instant::now();

        let triangles = match pool {
            Some(pool) => render_objects_parallel(
                &self.objects,
                &self.palette,
                &mut self.frame,
                pool,
                self.band_rows,
            ),
            None => render_objects(&self.objects, &self.palette, &mut self.frame),
        };
        let rasterized = Instant::now();

        let recomputed = post_process(&self.objects, &mut self.frame, &self.shadow, pool);
        self.frame.visualize(self.debug_view);
        let shaded = Instant::now();

        self.frames_rendered += 1;
        FrameStats {
            clear: cleared - start,
            raster: rasterized - cleared,
            shadow: shaded - rasterized,
            triangles,
            recomputed,
            parallel: pool.is_some(),
        }
    }

    /// The color buffer as ARGB8888 bytes.
    pub fn frame_buffer(&self) -> &[u8] {
        self.frame.color_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(use_pool: bool) -> RenderConfig {
        RenderConfig {
            width: 160,
            height: 120,
            workers: 3,
            queue_capacity: 32,
            use_pool,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn renders_demo_scene() {
        let mut engine = Engine::new(&small_config(false)).unwrap();
        engine.load_demo_scene().unwrap();
        let stats = engine.render();
        assert!(stats.triangles > 0);
        assert!(stats.recomputed);
        assert!(!stats.parallel);
        assert_eq!(engine.frame_buffer().len(), 160 * 120 * 4);
        assert_eq!(engine.frames_rendered(), 1);
    }

    #[test]
    fn recompute_follows_interval() {
        let mut engine = Engine::new(&small_config(false)).unwrap();
        engine.load_demo_scene().unwrap();
        let pattern: Vec<bool> = (0..5).map(|_| engine.render().recomputed).collect();
        assert_eq!(pattern, vec![true, false, false, false, true]);
    }

    #[test]
    fn pooled_and_serial_frames_match() {
        let mut serial = Engine::new(&small_config(false)).unwrap();
        let mut pooled = Engine::new(&small_config(true)).unwrap();
        for engine in [&mut serial, &mut pooled] {
            engine.load_demo_scene().unwrap();
            engine.animate_demo_scene(30);
        }
        for _ in 0..3 {
            let a = serial.render();
            let b = pooled.render();
            assert!(b.parallel);
            assert_eq!(a.triangles, b.triangles);
            assert_eq!(serial.frame_buffer(), pooled.frame_buffer());
        }
    }

    #[test]
    fn toggling_pool_starts_it_lazily() {
        let mut engine = Engine::new(&small_config(false)).unwrap();
        assert!(!engine.pool_enabled());
        assert!(engine.toggle_pool().unwrap());
        engine.load_demo_scene().unwrap();
        assert!(engine.render().parallel);
        assert!(!engine.toggle_pool().unwrap());
        assert!(!engine.render().parallel);
    }

    #[test]
    fn zero_stride_is_clamped() {
        let mut engine = Engine::new(&small_config(false)).unwrap();
        engine.set_shadow_stride(0);
        assert_eq!(engine.shadow_settings().stride, 1);
    }

    #[test]
    fn resize_reallocates_frame() {
        let mut engine = Engine::new(&small_config(false)).unwrap();
        engine.resize(64, 32).unwrap();
        assert_eq!((engine.width(), engine.height()), (64, 32));
        assert!(engine.resize(0, 32).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RenderConfig {
            width: 0,
            ..small_config(false)
        };
        assert!(matches!(Engine::new(&config), Err(RenderError::Config(_))));
    }
}
