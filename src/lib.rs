//! # Slicekit
//!
//! Geometric core of a 3D-printing slicer: boolean pixel-grid algebra,
//! marching-squares contour extraction, CSG half-plane trees, hatch/snake
//! infill synthesis, and the layer-ordered slicing pipeline.
//!
//! ## Architecture
//!
//! Slicekit is organized as a workspace with two crates:
//!
//! 1. **slicekit-geom** - 2D primitives, half-plane CSG, the pixel-grid
//!    engine, contouring, hatching, and polygons
//! 2. **slicekit-engine** - build configuration, layer rules, mesh
//!    sectioning, the slice cache, and the slicing orchestrator
//!
//! This facade re-exports both so hosts depend on one crate, and provides
//! logging setup. Typical use: build a [`BuildParams`], wrap each object
//! in a [`SliceSource`], hand both to a [`SliceOrchestrator`], and drain
//! [`LayerPaths`] top layer first into a G-code emitter.

pub use slicekit_engine as engine;
pub use slicekit_geom as geom;

pub use slicekit_geom::{
    Csg, GridResolution, HalfPlane, HatchParams, Interval, Line, MaterialId, PixelGrid, Point2,
    Point2i, Point3, Polygon, PolygonList, Rect, SnakeJoinParams, SpeedParams,
};

pub use slicekit_engine::{
    BuildParams, EngineError, ExtruderProfile, LayerPaths, LayerRules, MachineConfig,
    SliceOrchestrator, SliceSource, Triangle,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
