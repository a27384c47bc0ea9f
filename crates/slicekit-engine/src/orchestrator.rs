//! The slicing orchestrator: drives the per-layer pipeline strictly
//! top-down, caching slices, classifying infill against the layers above
//! and below, detecting bridges from their landing regions, and threading
//! the support recurrence from each layer to the one beneath it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use slicekit_geom::{
    Csg, HatchParams, MaterialId, PixelGrid, Point2, Polygon, PolygonList, Rect,
};

use crate::config::{BuildParams, ExtruderProfile};
use crate::error::Result;
use crate::layer_rules::LayerRules;
use crate::mesh::{mesh_height, section_mesh, Triangle};
use crate::slice_cache::SliceCache;

/// One object to be sliced, either a triangle soup or an extruded CSG
/// expression between two z heights.
#[derive(Debug)]
pub enum SliceSource {
    Mesh {
        triangles: Vec<Triangle>,
        material: MaterialId,
    },
    Prism {
        shape: Csg,
        bounds: Rect,
        z_min: f64,
        z_max: f64,
        material: MaterialId,
    },
}

impl SliceSource {
    fn material(&self) -> MaterialId {
        match self {
            SliceSource::Mesh { material, .. } => *material,
            SliceSource::Prism { material, .. } => *material,
        }
    }

    fn height(&self) -> f64 {
        match self {
            SliceSource::Mesh { triangles, .. } => mesh_height(triangles),
            SliceSource::Prism { z_max, .. } => *z_max,
        }
    }

    fn xy_bounds(&self) -> Rect {
        match self {
            SliceSource::Mesh { triangles, .. } => {
                let mut r = Rect::empty();
                for t in triangles {
                    r = r.expand_to(&t.a.xy());
                    r = r.expand_to(&t.b.xy());
                    r = r.expand_to(&t.c.xy());
                }
                r
            }
            SliceSource::Prism { bounds, .. } => *bounds,
        }
    }
}

/// The machine-ready paths of one layer, in plotting order: purge strokes
/// first, then outlines, infill, bridges, support.
#[derive(Debug)]
pub struct LayerPaths {
    pub machine_layer: usize,
    pub z: f64,
    pub purge: PolygonList,
    pub outlines: PolygonList,
    pub infill: PolygonList,
    pub bridges: PolygonList,
    pub support: PolygonList,
}

pub struct SliceOrchestrator {
    params: BuildParams,
    rules: LayerRules,
    objects: Vec<SliceSource>,
    cache: SliceCache,
    window: Rect,
    /// Support the layer above decided this layer must carry.
    pending_support: PixelGrid,
    /// Machine layer the next call will produce; counts down.
    cursor: usize,
    last_point: Option<Point2>,
}

impl SliceOrchestrator {
    pub fn new(params: BuildParams, objects: Vec<SliceSource>) -> Result<Self> {
        params.validate()?;
        let model_height = objects.iter().map(SliceSource::height).fold(0.0, f64::max);
        let rules = LayerRules::new(&params, model_height)?;

        let margin = Self::support_margin_of(&params);
        let mut bounds = Rect::empty();
        for o in &objects {
            bounds = bounds.union(&o.xy_bounds());
        }
        let window = bounds.offset(2.0 * margin + 2.0);
        if !params.machine.bed.contains(&window.sw()) || !params.machine.bed.contains(&window.ne())
        {
            warn!(window = %window, bed = %params.machine.bed, "build extends beyond the bed");
        }

        let cache = SliceCache::sized_for(params.max_surface_layers(), objects.len());
        let res = params.machine.resolution();
        let material = params.extruders[0].material;
        info!(
            layers = rules.machine_layer_count(),
            objects = objects.len(),
            "orchestrator ready"
        );
        Ok(Self {
            cursor: rules.machine_layer_count(),
            params,
            rules,
            objects,
            cache,
            window,
            pending_support: PixelGrid::nothing(res, material),
            last_point: None,
        })
    }

    pub fn rules(&self) -> &LayerRules {
        &self.rules
    }

    fn support_margin_of(params: &BuildParams) -> f64 {
        params
            .extruders
            .iter()
            .map(|e| e.support_margin)
            .fold(0.0, f64::max)
    }

    /// Produce the next machine layer, top first. `None` once the build is
    /// complete. Layers are strictly ordered: lower layers depend on the
    /// support recurrence and cached slices of the layers above.
    pub fn next_layer(&mut self) -> Result<Option<LayerPaths>> {
        if self.cursor == 0 {
            return Ok(None);
        }
        self.cursor -= 1;
        let machine_layer = self.cursor;
        let paths = match self.rules.model_layer(machine_layer) {
            Some(model_layer) => self.model_layer_paths(machine_layer, model_layer)?,
            None => self.foundation_layer(machine_layer)?,
        };
        Ok(Some(paths))
    }

    /// Run the whole build, top layer first.
    pub fn process_build(&mut self) -> Result<Vec<LayerPaths>> {
        let mut layers = Vec::with_capacity(self.rules.machine_layer_count());
        while let Some(paths) = self.next_layer()? {
            layers.push(paths);
        }
        Ok(layers)
    }

    /// Slice one object at one model layer, one grid per extruder slot.
    fn object_slice(&mut self, model_layer: usize, object: usize) -> Arc<Vec<PixelGrid>> {
        if let Some(hit) = self.cache.get(model_layer, object) {
            return Arc::clone(&hit.grids);
        }
        let res = self.params.machine.resolution();
        let z = self.rules.slice_z(model_layer);
        let px = res.pixel_size();
        let source = &self.objects[object];
        let material = source.material();

        let shape = if model_layer >= self.rules.model_layer_count() {
            PixelGrid::nothing(res, material)
        } else {
            match source {
                SliceSource::Prism {
                    shape,
                    z_min,
                    z_max,
                    ..
                } => {
                    if *z_min <= z && z <= *z_max {
                        PixelGrid::from_csg(self.window, res, material, shape)
                    } else {
                        PixelGrid::nothing(res, material)
                    }
                }
                SliceSource::Mesh { triangles, .. } => {
                    let loops = section_mesh(triangles, z, px, material);
                    let mut grid = PixelGrid::nothing(res, material);
                    // Even-odd composition so holes carve rather than fill.
                    for poly in &loops {
                        match poly.to_csg() {
                            Ok(csg) => {
                                let ring =
                                    PixelGrid::from_csg(self.window, res, material, &csg);
                                grid = xor(&grid, &ring);
                            }
                            Err(e) => {
                                warn!(z, error = %e, "degenerate section loop skipped")
                            }
                        }
                    }
                    grid
                }
            }
        };

        let grids: Vec<PixelGrid> = self
            .params
            .extruders
            .iter()
            .map(|e| {
                if e.material == material {
                    shape.clone()
                } else {
                    PixelGrid::nothing(res, e.material)
                }
            })
            .collect();
        self.cache.insert(model_layer, object, grids)
    }

    /// Union over all objects of one extruder's grid at one model layer.
    fn extruder_slice(&mut self, model_layer: usize, extruder: usize) -> PixelGrid {
        let res = self.params.machine.resolution();
        let mut out = PixelGrid::nothing(res, self.params.extruders[extruder].material);
        for object in 0..self.objects.len() {
            let grids = self.object_slice(model_layer, object);
            out = PixelGrid::union(&out, &grids[extruder]);
        }
        out
    }

    /// Union over every object and extruder: the layer's whole footprint.
    fn footprint(&mut self, model_layer: usize) -> PixelGrid {
        let res = self.params.machine.resolution();
        let mut out = PixelGrid::nothing(res, self.params.extruders[0].material);
        for extruder in 0..self.params.extruders.len() {
            let g = self.extruder_slice(model_layer, extruder);
            out = PixelGrid::union(&out, &g);
        }
        out
    }

    /// Intersection of the `count` slices starting at `from` and stepping
    /// by `step` (+1 above, -1 below). Out-of-range layers are `nothing`,
    /// so slices near the top and bottom classify as all-surface.
    fn slab_intersection(
        &mut self,
        from: usize,
        step: isize,
        count: usize,
        extruder: usize,
    ) -> PixelGrid {
        let res = self.params.machine.resolution();
        let material = self.params.extruders[extruder].material;
        let mut acc: Option<PixelGrid> = None;
        for k in 0..count {
            let layer = from as isize + step * (k as isize + 1);
            let slice = if layer < 0 || layer as usize >= self.rules.model_layer_count() {
                PixelGrid::nothing(res, material)
            } else {
                self.extruder_slice(layer as usize, extruder)
            };
            acc = Some(match acc {
                None => slice,
                Some(a) => PixelGrid::intersection(&a, &slice),
            });
        }
        acc.unwrap_or_else(|| PixelGrid::nothing(res, material))
    }

    fn model_layer_paths(&mut self, machine_layer: usize, model_layer: usize) -> Result<LayerPaths> {
        let angle = self.rules.hatch_angle(machine_layer);
        let tolerance = self.params.simplify_tolerance();

        let mut paths = LayerPaths {
            machine_layer,
            z: self.rules.machine_z(machine_layer),
            purge: PolygonList::new(),
            outlines: PolygonList::new(),
            infill: PolygonList::new(),
            bridges: PolygonList::new(),
            support: PolygonList::new(),
        };

        for extruder in 0..self.params.extruders.len() {
            let profile = self.params.extruders[extruder].clone();
            if !self.rules.extruder_live(&profile, machine_layer) {
                continue;
            }
            let slice = self.extruder_slice(model_layer, extruder);
            if !slice.any_solid() {
                continue;
            }

            if let Some(line) = self.rules.purge_line(&profile, extruder) {
                self.record_path(machine_layer, &line, profile.material);
                paths.purge.push(line);
            }

            let region = slice.offset(-profile.arc_compensation);
            let outlines = region.contours(tolerance);
            for poly in &outlines {
                let seamed = match self
                    .last_point
                    .and_then(|p| poly.nearest_vertex_to(&p))
                {
                    Some(i) => poly.with_start(i),
                    None => poly.clone(),
                };
                let mut profiled = seamed.speed_profile(&profile.speeds);
                profiled.set_extrude_end(profile.extrude_over_run);
                profiled.set_valve_end(profile.valve_over_run);
                self.record_path(machine_layer, &profiled, profile.material);
                paths.outlines.push(profiled);
            }

            self.classify_infill(
                model_layer,
                machine_layer,
                extruder,
                &profile,
                &region,
                angle,
                &mut paths,
            );
        }

        // Support recurrence: whatever the layer above said must be held
        // up, minus what this layer (grown by the margin) already holds up
        // itself. The margin on both sides keeps support off the model's
        // walls and stops mild slopes from triggering it.
        let margin = Self::support_margin_of(&self.params);
        let footprint = self.footprint(model_layer);
        // The derivative is layer-wide, so it lives on the layer's first
        // object slot; a cache hit skips recomputing the difference.
        let cached = self.cache.get(model_layer, 0).and_then(|s| s.support.clone());
        let support_region = match cached {
            Some(region) => (*region).clone(),
            None => {
                let region =
                    PixelGrid::difference(&self.pending_support, &footprint.offset(margin));
                self.cache.set_support(model_layer, 0, region.clone());
                region
            }
        };
        if support_region.any_solid() {
            let support_profile = self.params.extruders[0].clone();
            let hatch = support_region.hatch(&support_profile.infill_hatch(angle));
            for poly in &hatch {
                self.record_path(machine_layer, poly, support_profile.material);
            }
            paths.support.append(hatch);
        }
        // Re-windowing stops the grown grid's backing rectangle creeping
        // outwards layer after layer.
        let carried = PixelGrid::union(&footprint, &support_region);
        self.pending_support = carried.offset(margin).windowed(self.window);

        debug!(
            machine_layer,
            outlines = paths.outlines.len(),
            infill = paths.infill.len(),
            bridges = paths.bridges.len(),
            support = paths.support.len(),
            "layer complete"
        );
        Ok(paths)
    }

    #[allow(clippy::too_many_arguments)]
    fn classify_infill(
        &mut self,
        model_layer: usize,
        machine_layer: usize,
        extruder: usize,
        profile: &ExtruderProfile,
        region: &PixelGrid,
        angle: f64,
        paths: &mut LayerPaths,
    ) {
        let surfaces = profile.surface_layers;
        if surfaces == 0 {
            let hatch = region.hatch(&profile.infill_hatch(angle));
            self.push_infill(machine_layer, profile, hatch, &mut paths.infill);
            return;
        }

        let above = self.slab_intersection(model_layer, 1, surfaces, extruder);
        let below = self.slab_intersection(model_layer, -1, surfaces, extruder);
        let nothing_above = PixelGrid::difference(region, &above);
        let nothing_below = PixelGrid::difference(region, &below);
        let interior = PixelGrid::difference(
            &PixelGrid::difference(region, &nothing_above),
            &nothing_below,
        );

        let fine = HatchParams {
            spacing: profile.extrusion_width,
            angle,
            join: None,
        };

        // Downward-facing regions either bridge between landings or get
        // fine surface infill over support.
        let below1 = if model_layer == 0 {
            PixelGrid::nothing(region.resolution(), profile.material)
        } else {
            self.extruder_slice(model_layer - 1, extruder)
        };
        for part in nothing_below.connected_regions() {
            match bridge_angle(&part, &below1, profile.extrusion_width) {
                Some(direction) => {
                    let hatch = part.hatch(&HatchParams {
                        spacing: profile.extrusion_width,
                        angle: direction,
                        join: None,
                    });
                    self.push_infill(machine_layer, profile, hatch, &mut paths.bridges);
                }
                None => {
                    let hatch = part.hatch(&fine);
                    self.push_infill(machine_layer, profile, hatch, &mut paths.infill);
                }
            }
        }

        // Upward-facing surface (minus anything already treated as
        // downward-facing) gets fine infill; the rest is coarse interior.
        let top_only = PixelGrid::difference(&nothing_above, &nothing_below);
        let hatch = top_only.hatch(&fine);
        self.push_infill(machine_layer, profile, hatch, &mut paths.infill);

        let hatch = interior.hatch(&profile.infill_hatch(angle));
        self.push_infill(machine_layer, profile, hatch, &mut paths.infill);
    }

    fn push_infill(
        &mut self,
        machine_layer: usize,
        profile: &ExtruderProfile,
        hatch: PolygonList,
        into: &mut PolygonList,
    ) {
        for poly in &hatch {
            let mut p = poly.clone();
            p.set_extrude_end(profile.extrude_over_run);
            self.record_path(machine_layer, &p, profile.material);
            into.push(p);
        }
    }

    fn record_path(&mut self, machine_layer: usize, poly: &Polygon, material: MaterialId) {
        if let Some(first) = poly.first() {
            self.rules.set_first_point(machine_layer, first, material);
        }
        if let Some(last) = poly.last() {
            self.rules.set_last_point(machine_layer, last, material);
            self.last_point = Some(last);
        }
    }

    /// Foundation layers carry the model's lowest footprint plus any
    /// support landing on the bed, grown by the support margin.
    fn foundation_layer(&mut self, machine_layer: usize) -> Result<LayerPaths> {
        let angle = self.rules.hatch_angle(machine_layer);
        let tolerance = self.params.simplify_tolerance();
        let profile = self.params.extruders[0].clone();
        let margin = Self::support_margin_of(&self.params);

        let base = self.footprint(0);
        let region = PixelGrid::union(&base, &self.pending_support).offset(margin);

        let mut paths = LayerPaths {
            machine_layer,
            z: self.rules.machine_z(machine_layer),
            purge: PolygonList::new(),
            outlines: PolygonList::new(),
            infill: PolygonList::new(),
            bridges: PolygonList::new(),
            support: PolygonList::new(),
        };
        if let Some(line) = self.rules.purge_line(&profile, 0) {
            self.record_path(machine_layer, &line, profile.material);
            paths.purge.push(line);
        }
        for poly in &region.contours(tolerance) {
            let profiled = poly.speed_profile(&profile.speeds);
            self.record_path(machine_layer, &profiled, profile.material);
            paths.outlines.push(profiled);
        }
        let hatch = region.hatch(&profile.infill_hatch(angle));
        self.push_infill(machine_layer, &profile, hatch, &mut paths.infill);
        Ok(paths)
    }
}

/// Symmetric difference, the even-odd composition step for section rings.
fn xor(a: &PixelGrid, b: &PixelGrid) -> PixelGrid {
    PixelGrid::difference(&PixelGrid::union(a, b), &PixelGrid::intersection(a, b))
}

/// Decide whether a downward-facing region bridges: it must land on at
/// least two separate islands of the layer below, and the bridge runs
/// between the two largest landings. `None` means no bridge (fine surface
/// over support instead).
fn bridge_angle(region: &PixelGrid, below: &PixelGrid, track_width: f64) -> Option<f64> {
    let reach = region.offset(2.0 * track_width);
    let lands = PixelGrid::intersection(&reach, below);
    let mut islands = lands.connected_regions();
    if islands.len() < 2 {
        return None;
    }
    islands.sort_by_key(|g| std::cmp::Reverse(g.count_solid()));
    let a = islands[0].centroid()?;
    let b = islands[1].centroid()?;
    let d = b - a;
    Some(d.y.atan2(d.x))
}
