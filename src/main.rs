use std::time::{Duration, Instant};

use shadeline::config::RenderConfig;
use shadeline::engine::{Engine, FrameStats};
use shadeline::window::{save_screenshot, Window, WindowEvent};

const STATS_INTERVAL: u64 = 256;

/// Running sums of per-phase timings between two stats log lines.
#[derive(Default)]
struct StatsAccumulator {
    frames: u32,
    clear: Duration,
    raster: Duration,
    shadow: Duration,
    present: Duration,
    recomputes: u32,
}

impl StatsAccumulator {
    fn add(&mut self, stats: &FrameStats, present: Duration) {
        self.frames += 1;
        self.clear += stats.clear;
        self.raster += stats.raster;
        self.shadow += stats.shadow;
        self.present += present;
        self.recomputes += u32::from(stats.recomputed);
    }

    fn log(&self, frame: u64, engine: &Engine) {
        if self.frames == 0 {
            return;
        }
        let ms = |d: Duration| d.as_secs_f64() * 1000.0 / f64::from(self.frames);
        let total = ms(self.clear) + ms(self.raster) + ms(self.shadow) + ms(self.present);
        log::info!(
            "frame {frame}  clear: {:.2} ms  raster: {:.2} ms  shadow: {:.2} ms  present: {:.2} ms  \
             total: {:.2} ms  fps: {:.1}  recomputes: {}  stride: {}  pool: {}",
            ms(self.clear),
            ms(self.raster),
            ms(self.shadow),
            ms(self.present),
            total,
            1000.0 / total.max(1e-3),
            self.recomputes,
            engine.shadow_settings().stride,
            engine.pool_enabled(),
        );
    }
}

fn load_config() -> Result<RenderConfig, String> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading config from {path}");
            RenderConfig::load(&path).map_err(|e| format!("{path}: {e}"))
        }
        None => Ok(RenderConfig::default()),
    }
}

fn main() -> Result<(), String> {
    env_logger::init();

    let config = load_config()?;
    let mut window = Window::new("Shadeline", config.width, config.height)?;
    let mut engine = Engine::new(&config).map_err(|e| e.to_string())?;
    engine.load_demo_scene().map_err(|e| e.to_string())?;
    log::info!("keys: 1-5 shadow stride, V debug view, P worker pool, F12 screenshot, Esc quit");

    let mut frame: u64 = 0;
    let mut stats = StatsAccumulator::default();
    let mut screenshots = 0u32;

    'running: loop {
        for event in window.poll_events() {
            match event {
                WindowEvent::Quit => break 'running,
                WindowEvent::Resize(w, h) => {
                    window.resize(w, h)?;
                    engine.resize(w, h).map_err(|e| e.to_string())?;
                }
                WindowEvent::SetShadowStride(stride) => engine.set_shadow_stride(stride),
                WindowEvent::CycleDebugView => {
                    let view = engine.cycle_debug_view();
                    window.set_title(&format!("Shadeline - {view}"))?;
                }
                WindowEvent::TogglePool => {
                    if let Err(e) = engine.toggle_pool() {
                        log::error!("cannot start worker pool: {e}");
                    }
                }
                WindowEvent::Screenshot => {
                    screenshots += 1;
                    let path = format!("shadeline-{screenshots:03}.png");
                    if let Err(e) = save_screenshot(engine.frame(), &path) {
                        log::error!("{e}");
                    }
                }
            }
        }

        frame += 1;
        engine.animate_demo_scene(frame);
        let frame_stats = engine.render();

        let present_start = Instant::now();
        window.present(engine.frame_buffer())?;
        stats.add(&frame_stats, present_start.elapsed());

        if frame % STATS_INTERVAL == 0 {
            stats.log(frame, &engine);
            stats = StatsAccumulator::default();
        }
    }

    Ok(())
}
