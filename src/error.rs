//! Error types.
//!
//! Only set-up paths return errors: allocating a frame, spawning the worker
//! pool, reading configuration, loading meshes, writing screenshots. The
//! per-frame hot path treats degenerate input as "no contribution" and never
//! fails.

use thiserror::Error;

/// Top-level error for building renderer state.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load mesh '{path}': {source}")]
    MeshLoad {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("mesh '{0}' contains no usable triangles")]
    EmptyMesh(String),

    #[error("failed to write screenshot: {0}")]
    Screenshot(#[from] image::ImageError),
}

/// Worker pool construction errors.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("worker pool queue capacity must be at least one")]
    NoCapacity,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
