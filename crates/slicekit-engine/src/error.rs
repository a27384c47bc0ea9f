//! Error types for the slicing engine.

use thiserror::Error;

/// Errors that can occur while driving the slicing pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Only top-down slicing is implemented; bottom-up is rejected at
    /// construction rather than silently forced.
    #[error("Unsupported slicing direction: bottom-up")]
    UnsupportedDirection,

    /// The build has no extruder profiles to slice for.
    #[error("Build configured with no extruders")]
    NoExtruders,

    /// An extruder layer height was zero or negative.
    #[error("Extruder {extruder} has invalid layer height {height}")]
    InvalidLayerHeight { extruder: u32, height: f64 },

    /// A layer index was outside the configured build.
    #[error("Layer {layer} outside build of {layers} machine layers")]
    LayerOutOfRange { layer: usize, layers: usize },

    /// A geometric operation inside the pipeline failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] slicekit_geom::GeomError),

    /// Configuration could not be (de)serialized.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
