//! Rendering pipeline stages.
//!
//! - [`frame`]: the per-frame buffers every stage reads and writes
//! - [`rasterizer`]: triangles into the G-buffer
//! - [`shadow`]: cached shadows and reflections composited over the raster image
//! - [`blur`]: the shadow mask's separable box blur

pub mod blur;
pub mod frame;
pub mod rasterizer;
pub mod shadow;

pub use frame::{DebugView, FrameContext, DEPTH_EMPTY};
pub use rasterizer::{render_object, render_objects, render_objects_parallel};
pub use shadow::{post_process, ShadowSettings};
