//! Material attribution for grids and polygons.

use serde::{Deserialize, Serialize};

/// Opaque material/extruder identifier. The engine correlates these 1:1
/// with extruder profiles; the geometry layer only threads them through so
/// every output polygon stays tagged with the material that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "material#{}", self.0)
    }
}
