//! # Slicekit Geometry
//!
//! The geometric core of the slicer: 2D primitives, half-plane CSG
//! expressions, the rasterized pixel-grid engine, and toolpath polygons.
//!
//! ## Core Components
//!
//! - **Primitives**: points, intervals, rectangles, parametric lines
//! - **Half-planes and CSG**: exact region descriptions of layer outlines,
//!   built from polygons and evaluated by sign or over intervals
//! - **Pixel grids**: boolean set algebra on machine-resolution bitmaps,
//!   rasterized from CSG expressions tile by tile
//! - **Contours and hatching**: marching-squares boundary extraction and
//!   snake-stitched infill generation
//! - **Polygons**: toolpath rings and open paths with per-vertex speeds
//!   and end-of-path markers
//!
//! The conversion cycle polygon -> CSG -> grid -> contour polygons is the
//! backbone of the slicing pipeline: exact geometry in, machine-accurate
//! toolpaths out.

pub mod csg;
pub mod error;
pub mod grid;
pub mod halfplane;
pub mod interval;
pub mod line;
pub mod material;
pub mod point;
pub mod polygon;
pub mod rect;

pub use csg::Csg;
pub use error::{GeomError, Result};
pub use grid::{GridResolution, HatchParams, PixelGrid, SnakeJoinParams};
pub use halfplane::HalfPlane;
pub use interval::{Interval, IntervalSign};
pub use line::Line;
pub use material::MaterialId;
pub use point::{Point2, Point2i, Point3};
pub use polygon::{EndMarker, Polygon, PolygonList, SpeedParams};
pub use rect::Rect;
