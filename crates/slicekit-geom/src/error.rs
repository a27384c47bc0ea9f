//! Error types for the geometry crate.
//!
//! Geometric degeneracy is a first-class failure value here, never a silent
//! NaN: callers that ask two parallel lines for a crossing point get
//! [`GeomError::Parallel`] and must fall back (usually by treating the pair
//! as non-crossing).

use thiserror::Error;

/// Errors that can occur during geometric operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// Two lines or half-planes are parallel where a crossing was requested.
    #[error("Parallel lines: {0}")]
    Parallel(String),

    /// A 3D half-space could not be sectioned at the requested z height.
    #[error("Slicing plane is parallel to face at z={z}")]
    ParallelSlice { z: f64 },

    /// A grid coordinate fell outside its backing rectangle.
    #[error("Grid coordinate ({x}, {y}) outside backing rectangle {rect}")]
    OutOfGrid { x: i32, y: i32, rect: String },

    /// A polygon operation was asked for on too few points.
    #[error("Polygon has {count} points, need at least {needed}")]
    TooFewPoints { count: usize, needed: usize },

    /// Per-vertex speeds exist on the polygon but none was supplied.
    #[error("Polygon carries speeds; point appended without one")]
    MissingSpeed,
}

/// Result type alias for geometric operations.
pub type Result<T> = std::result::Result<T, GeomError>;
