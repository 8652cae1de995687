//! A CPU software renderer with screen-space shadows and reflections.
//!
//! Triangles are rasterized into a G-buffer (color, depth, normal, world
//! position, reflection direction). A post-process stage then approximates
//! shadows and reflections by casting rays against each object's bounding
//! box, caches the results for a few frames, and composites them over the
//! raster image. Both stages can run on a fixed worker pool, split into
//! disjoint bands of rows. SDL2 is used only for the demo window.
//!
//! # Quick Start
//!
//! ```ignore
//! use shadeline::prelude::*;
//!
//! let mut engine = Engine::new(&RenderConfig::default())?;
//! engine.load_demo_scene()?;
//! let stats = engine.render();
//! let pixels: &[u8] = engine.frame_buffer();
//! ```

pub mod camera;
pub mod colors;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod light;
pub mod material;
pub mod math;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod transform;
pub mod window;

pub use engine::{Engine, FrameStats};
pub use error::{ConfigError, PoolError, RenderError};
pub use render::frame::{DebugView, FrameContext};
pub use scene::SceneObject;
pub use transform::Transform;

/// Prelude module for convenient imports.
///
/// # Example
/// ```ignore
/// use shadeline::prelude::*;
/// ```
pub mod prelude {
    // Camera & light
    pub use crate::camera::Camera;
    pub use crate::light::DirectionalLight;

    // Configuration
    pub use crate::config::{Config, RenderConfig};

    // Engine
    pub use crate::engine::{Engine, FrameStats};
    pub use crate::error::RenderError;

    // Scene
    pub use crate::material::{Material, MaterialId, MaterialPalette};
    pub use crate::scene::{SceneObject, SceneTriangle};
    pub use crate::transform::Transform;

    // Math
    pub use crate::math::{Aabb, Mat4, Ray, Vec2, Vec3};

    // Rendering
    pub use crate::render::frame::{DebugView, FrameContext};
    pub use crate::render::rasterizer::{render_object, render_objects, render_objects_parallel};
    pub use crate::render::shadow::{post_process, ShadowSettings};
    pub use crate::scheduler::WorkerPool;
}
