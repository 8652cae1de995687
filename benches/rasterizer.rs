use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shadeline::camera::Camera;
use shadeline::colors;
use shadeline::demo::{animate_demo_scene, build_demo_scene};
use shadeline::light::DirectionalLight;
use shadeline::material::MaterialPalette;
use shadeline::math::{batch, Vec3};
use shadeline::render::frame::FrameContext;
use shadeline::render::rasterizer::{render_objects, render_objects_parallel};
use shadeline::render::shadow::{post_process, ShadowSettings};
use shadeline::scene::SceneObject;
use shadeline::scheduler::WorkerPool;

const BUFFER_WIDTH: u32 = 800;
const BUFFER_HEIGHT: u32 = 600;

fn create_frame() -> FrameContext {
    FrameContext::new(
        BUFFER_WIDTH,
        BUFFER_HEIGHT,
        Camera::default(),
        DirectionalLight::default(),
    )
    .unwrap()
}

fn demo_scene() -> (Vec<SceneObject>, MaterialPalette) {
    let mut palette = MaterialPalette::new();
    let mut objects = build_demo_scene(&mut palette).unwrap();
    animate_demo_scene(&mut objects, 60);
    (objects, palette)
}

fn worker_count() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

fn benchmark_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize_demo_scene");
    let (objects, palette) = demo_scene();

    group.bench_function("serial", |b| {
        let mut frame = create_frame();
        b.iter(|| {
            frame.clear(colors::BACKGROUND);
            render_objects(black_box(&objects), &palette, &mut frame)
        });
    });

    let pool = WorkerPool::new(worker_count(), 1024).unwrap();
    for band_rows in [8, 16, 64] {
        group.bench_with_input(BenchmarkId::new("banded", band_rows), &band_rows, |b, &rows| {
            let mut frame = create_frame();
            b.iter(|| {
                frame.clear(colors::BACKGROUND);
                render_objects_parallel(black_box(&objects), &palette, &mut frame, &pool, rows)
            });
        });
    }

    group.finish();
}

fn benchmark_shadow(c: &mut Criterion) {
    let mut group = c.benchmark_group("shadow_recompute");
    let (objects, palette) = demo_scene();
    let pool = WorkerPool::new(worker_count(), 1024).unwrap();

    let mut frame = create_frame();
    frame.clear(colors::BACKGROUND);
    render_objects(&objects, &palette, &mut frame);
    let gbuffer_color = frame.color().to_vec();

    for stride in [1, 2, 4] {
        let settings = ShadowSettings {
            stride,
            recompute_interval: 1,
            ..ShadowSettings::default()
        };
        group.bench_with_input(BenchmarkId::new("serial", stride), &settings, |b, s| {
            b.iter(|| {
                frame.color_mut().copy_from_slice(&gbuffer_color);
                post_process(black_box(&objects), &mut frame, s, None)
            });
        });
        group.bench_with_input(BenchmarkId::new("pooled", stride), &settings, |b, s| {
            b.iter(|| {
                frame.color_mut().copy_from_slice(&gbuffer_color);
                post_process(black_box(&objects), &mut frame, s, Some(&pool))
            });
        });
    }

    group.finish();
}

fn benchmark_reflect(c: &mut Criterion) {
    let mut group = c.benchmark_group("reflect_normalize");
    let normal = Vec3::new(0.1, 0.9, -0.2).normalize();
    let rays: Vec<[Vec3; 4]> = (0..1024)
        .map(|i| {
            let f = i as f32;
            std::array::from_fn(|k| Vec3::new(f * 0.01 + k as f32, -1.0 - f * 0.002, 3.0 + k as f32))
        })
        .collect();

    group.bench_function("batched_4096", |b| {
        b.iter(|| {
            let mut acc = Vec3::ZERO;
            for quad in &rays {
                let mut q = *quad;
                batch::normalize4(&mut q);
                let r = batch::reflect_normalize4(&q, normal);
                acc = acc + r[0] + r[3];
            }
            black_box(acc)
        });
    });

    group.bench_function("scalar_4096", |b| {
        b.iter(|| {
            let mut acc = Vec3::ZERO;
            for quad in &rays {
                let r: [Vec3; 4] =
                    std::array::from_fn(|k| batch::reflect_normalize(batch::normalize(quad[k]), normal));
                acc = acc + r[0] + r[3];
            }
            black_box(acc)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_rasterize, benchmark_shadow, benchmark_reflect);
criterion_main!(benches);
