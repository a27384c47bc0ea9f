//! Ring-buffer cache of computed layer slices.
//!
//! Keyed by (model layer, object); sized from the widest surface-layer
//! window any extruder asks for, so every look-ahead and look-behind the
//! infill classifier makes stays resident while the pipeline descends.
//! Grids are shared out as `Arc`s and never mutated after insertion.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use slicekit_geom::PixelGrid;

/// One cached slice: per-extruder grids plus the support derivative once
/// the recurrence has produced it.
#[derive(Debug)]
pub struct CachedSlice {
    pub grids: Arc<Vec<PixelGrid>>,
    pub support: Option<Arc<PixelGrid>>,
}

#[derive(Debug)]
pub struct SliceCache {
    ring: VecDeque<((usize, usize), CachedSlice)>,
    capacity: usize,
}

impl SliceCache {
    /// Capacity covers the classification window (surface layers above and
    /// below, the layer itself, and one spare each way) for every object.
    pub fn sized_for(max_surface_layers: usize, objects: usize) -> Self {
        let capacity = (2 * max_surface_layers + 3) * objects.max(1);
        debug!(capacity, "slice cache created");
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn get(&self, layer: usize, object: usize) -> Option<&CachedSlice> {
        self.ring
            .iter()
            .find(|(k, _)| *k == (layer, object))
            .map(|(_, v)| v)
    }

    /// Insert a freshly computed slice, evicting the oldest entry when the
    /// ring is full. Re-inserting an existing key replaces it. Returns the
    /// shared grids so the caller keeps its handle past any eviction.
    pub fn insert(
        &mut self,
        layer: usize,
        object: usize,
        grids: Vec<PixelGrid>,
    ) -> Arc<Vec<PixelGrid>> {
        self.ring.retain(|(k, _)| *k != (layer, object));
        if self.ring.len() >= self.capacity {
            if let Some(((l, o), _)) = self.ring.pop_front() {
                debug!(layer = l, object = o, "evicted oldest slice");
            }
        }
        let grids = Arc::new(grids);
        self.ring.push_back((
            (layer, object),
            CachedSlice {
                grids: Arc::clone(&grids),
                support: None,
            },
        ));
        grids
    }

    /// Attach the support derivative to an already-cached slice.
    pub fn set_support(&mut self, layer: usize, object: usize, support: PixelGrid) {
        if let Some((_, slice)) = self
            .ring
            .iter_mut()
            .find(|(k, _)| *k == (layer, object))
        {
            slice.support = Some(Arc::new(support));
        }
    }
}
