//! # Slicekit Engine
//!
//! The layer pipeline on top of the geometry crate: build configuration,
//! layer rules, triangle-mesh sectioning, the slice cache, and the
//! orchestrator that turns objects into per-layer machine paths.
//!
//! The pipeline is single-threaded and strictly ordered: layers are
//! produced top-down because support and infill classification at each
//! layer depend on slices cached for the layers above.

pub mod config;
pub mod error;
pub mod layer_rules;
pub mod mesh;
pub mod orchestrator;
pub mod slice_cache;

pub use config::{BuildParams, ExtruderProfile, MachineConfig};
pub use error::{EngineError, Result};
pub use layer_rules::{LayerEnds, LayerRules};
pub use mesh::{cuboid, mesh_height, section_mesh, Triangle};
pub use orchestrator::{LayerPaths, SliceOrchestrator, SliceSource};
pub use slice_cache::{CachedSlice, SliceCache};
