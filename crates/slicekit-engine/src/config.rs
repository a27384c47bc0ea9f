//! Build configuration: machine geometry, extruder profiles, and the
//! aggregated build parameters.
//!
//! Everything here is plain serde data, persisted as JSON by hosts. None
//! of it is global: configuration is threaded through constructors so
//! independent builds can run side by side in one process.

use serde::{Deserialize, Serialize};

use slicekit_geom::{
    GridResolution, HatchParams, MaterialId, Point2, Rect, SnakeJoinParams, SpeedParams,
};

use crate::error::{EngineError, Result};

/// Machine-level geometry and slicing direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Raster resolution in pixels per millimetre.
    pub pixels_per_mm: f64,
    /// Printable bed area.
    pub bed: Rect,
    /// Number of raft/foundation layers below the model.
    #[serde(default)]
    pub foundation_layers: usize,
    /// Where extruders prime before a layer; `None` disables purging.
    #[serde(default)]
    pub purge_location: Option<Point2>,
    /// Slice from the top of the model downwards. Bottom-up is not
    /// implemented; see [`crate::LayerRules::new`].
    #[serde(default = "default_true")]
    pub top_down: bool,
}

fn default_true() -> bool {
    true
}

impl MachineConfig {
    pub fn resolution(&self) -> GridResolution {
        GridResolution::new(self.pixels_per_mm)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            pixels_per_mm: 10.0,
            bed: Rect::new(Point2::new(0.0, 0.0), Point2::new(200.0, 200.0)),
            foundation_layers: 0,
            purge_location: None,
            top_down: true,
        }
    }
}

/// Per-extruder material and deposition parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtruderProfile {
    pub material: MaterialId,
    /// Layer height this extruder deposits, millimetres.
    pub layer_height: f64,
    /// Width of one outline track.
    pub extrusion_width: f64,
    /// Spacing between infill hatch lines.
    pub infill_width: f64,
    /// How many solid layers to lay over/under interior infill.
    pub surface_layers: usize,
    /// Outline shrink compensating for track width and arc squash.
    pub arc_compensation: f64,
    /// How far support geometry extends beyond the supported footprint.
    pub support_margin: f64,
    /// Travel distance before the path end at which extrusion shuts off.
    #[serde(default)]
    pub extrude_over_run: f64,
    /// Travel distance before the path end at which the valve shuts.
    #[serde(default)]
    pub valve_over_run: f64,
    /// Machine limits for the per-vertex speed profile.
    pub speeds: SpeedParams,
}

impl Default for ExtruderProfile {
    fn default() -> Self {
        Self {
            material: MaterialId(0),
            layer_height: 0.24,
            extrusion_width: 0.5,
            infill_width: 1.5,
            surface_layers: 2,
            arc_compensation: 0.25,
            support_margin: 1.0,
            extrude_over_run: 2.0,
            valve_over_run: 0.0,
            speeds: SpeedParams {
                cruise: 30.0,
                corner_min: 5.0,
                acceleration: 800.0,
            },
        }
    }
}

impl ExtruderProfile {
    /// Hatch parameters for this extruder's infill at the given direction.
    pub fn infill_hatch(&self, angle: f64) -> HatchParams {
        HatchParams {
            spacing: self.infill_width,
            angle,
            join: Some(SnakeJoinParams::for_spacing(self.infill_width)),
        }
    }
}

/// Everything the pipeline needs for one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildParams {
    pub machine: MachineConfig,
    pub extruders: Vec<ExtruderProfile>,
    /// Contour simplification tolerance, in pixels.
    #[serde(default = "default_simplify_pixels")]
    pub simplify_pixels: f64,
}

fn default_simplify_pixels() -> f64 {
    0.8
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            machine: MachineConfig::default(),
            extruders: vec![ExtruderProfile::default()],
            simplify_pixels: default_simplify_pixels(),
        }
    }
}

impl BuildParams {
    /// Validate invariants the pipeline depends on.
    pub fn validate(&self) -> Result<()> {
        if self.extruders.is_empty() {
            return Err(EngineError::NoExtruders);
        }
        for e in &self.extruders {
            if e.layer_height <= 0.0 {
                return Err(EngineError::InvalidLayerHeight {
                    extruder: e.material.0,
                    height: e.layer_height,
                });
            }
        }
        Ok(())
    }

    /// Contour simplification tolerance in millimetres.
    pub fn simplify_tolerance(&self) -> f64 {
        self.simplify_pixels * self.machine.resolution().pixel_size()
    }

    /// The largest surface-layer count any extruder asks for; sizes the
    /// look-ahead window and the slice cache.
    pub fn max_surface_layers(&self) -> usize {
        self.extruders
            .iter()
            .map(|e| e.surface_layers)
            .max()
            .unwrap_or(0)
    }

    pub fn extruder_for(&self, material: MaterialId) -> Option<&ExtruderProfile> {
        self.extruders.iter().find(|e| e.material == material)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let params: BuildParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let params = BuildParams::default();
        let json = params.to_json().unwrap();
        let back = BuildParams::from_json(&json).unwrap();
        assert_eq!(back.extruders.len(), 1);
        assert_eq!(back.machine.pixels_per_mm, params.machine.pixels_per_mm);
        assert_eq!(back.simplify_pixels, params.simplify_pixels);
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let json = r#"{
            "machine": {
                "pixels_per_mm": 20.0,
                "bed": { "sw": { "x": 0.0, "y": 0.0 }, "ne": { "x": 100.0, "y": 100.0 }, "empty": false }
            },
            "extruders": [{
                "material": 0,
                "layer_height": 0.2,
                "extrusion_width": 0.4,
                "infill_width": 1.0,
                "surface_layers": 3,
                "arc_compensation": 0.2,
                "support_margin": 1.0,
                "speeds": { "cruise": 25.0, "corner_min": 4.0, "acceleration": 600.0 }
            }]
        }"#;
        let params = BuildParams::from_json(json).unwrap();
        assert!(params.machine.top_down);
        assert_eq!(params.machine.foundation_layers, 0);
        assert!(params.machine.purge_location.is_none());
        assert_eq!(params.simplify_pixels, 0.8);
    }

    #[test]
    fn test_validation_rejects_empty_extruders() {
        let params = BuildParams {
            extruders: Vec::new(),
            ..BuildParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(EngineError::NoExtruders)
        ));
    }

    #[test]
    fn test_validation_rejects_zero_layer_height() {
        let mut params = BuildParams::default();
        params.extruders[0].layer_height = 0.0;
        assert!(matches!(
            params.validate(),
            Err(EngineError::InvalidLayerHeight { .. })
        ));
    }
}
