//! Per-build layer bookkeeping: z-steps, foundation layers, the machine to
//! model layer mapping, hatch-direction alternation, and the first/last
//! point records the external reversal post-process consumes.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use tracing::{error, info, warn};

use slicekit_geom::{MaterialId, Point2, Polygon};

use crate::config::{BuildParams, ExtruderProfile};
use crate::error::{EngineError, Result};

/// First/last extrusion point of one machine layer, with the extruder of
/// record. Consumed by the layer-reversal post-processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerEnds {
    pub first: Option<(Point2, MaterialId)>,
    pub last: Option<(Point2, MaterialId)>,
}

/// The ordered sequence of machine layers for one build.
#[derive(Debug)]
pub struct LayerRules {
    z_step: f64,
    model_layers: usize,
    foundation_layers: usize,
    purge_location: Option<Point2>,
    ends: Vec<LayerEnds>,
}

/// Length of one purge stroke, millimetres.
const PURGE_LENGTH: f64 = 10.0;

impl LayerRules {
    /// Derive the layer sequence from the build parameters and the model's
    /// height. Only top-down slicing is supported; a bottom-up request is
    /// an error here rather than a silent fallback.
    pub fn new(params: &BuildParams, model_height: f64) -> Result<Self> {
        params.validate()?;
        if !params.machine.top_down {
            error!("bottom-up slicing requested; only top-down is implemented");
            return Err(EngineError::UnsupportedDirection);
        }

        // The machine steps by the finest layer height; coarser extruders
        // extrude on every k-th pass.
        let z_step = params
            .extruders
            .iter()
            .map(|e| e.layer_height)
            .fold(f64::MAX, f64::min);
        for e in &params.extruders {
            let ratio = e.layer_height / z_step;
            if (ratio - ratio.round()).abs() > 1e-6 {
                warn!(
                    material = %e.material,
                    layer_height = e.layer_height,
                    z_step,
                    "layer height is not a multiple of the finest step, rounding"
                );
            }
        }

        let model_layers = ((model_height / z_step).ceil() as usize).max(1);
        let foundation_layers = params.machine.foundation_layers;
        let machine_layers = model_layers + foundation_layers;
        info!(
            model_layers,
            foundation_layers, z_step, "layer rules established"
        );
        Ok(Self {
            z_step,
            model_layers,
            foundation_layers,
            purge_location: params.machine.purge_location,
            ends: vec![LayerEnds::default(); machine_layers],
        })
    }

    pub fn z_step(&self) -> f64 {
        self.z_step
    }

    pub fn machine_layer_count(&self) -> usize {
        self.model_layers + self.foundation_layers
    }

    pub fn model_layer_count(&self) -> usize {
        self.model_layers
    }

    pub fn foundation_layers(&self) -> usize {
        self.foundation_layers
    }

    pub fn is_foundation(&self, machine_layer: usize) -> bool {
        machine_layer < self.foundation_layers
    }

    /// Model layer index for a machine layer; `None` on foundation layers.
    pub fn model_layer(&self, machine_layer: usize) -> Option<usize> {
        machine_layer.checked_sub(self.foundation_layers)
    }

    /// Machine z at the top of a machine layer.
    pub fn machine_z(&self, machine_layer: usize) -> f64 {
        (machine_layer as f64 + 1.0) * self.z_step
    }

    /// Mid-layer z in model coordinates, where the slice is taken.
    pub fn slice_z(&self, model_layer: usize) -> f64 {
        (model_layer as f64 + 0.5) * self.z_step
    }

    /// Hatch direction for a machine layer: a diagonal base rotated a
    /// quarter turn on odd layers so consecutive infill passes cross.
    pub fn hatch_angle(&self, machine_layer: usize) -> f64 {
        if machine_layer % 2 == 0 {
            FRAC_PI_4
        } else {
            FRAC_PI_4 + FRAC_PI_2
        }
    }

    /// Does this extruder deposit on this machine layer? A coarse extruder
    /// at k times the finest step only extrudes every k-th layer, once
    /// enough height has accumulated under it.
    pub fn extruder_live(&self, profile: &ExtruderProfile, machine_layer: usize) -> bool {
        let Some(model_layer) = self.model_layer(machine_layer) else {
            // Foundation layers are laid by the finest extruder only.
            return (profile.layer_height / self.z_step).round() as usize <= 1;
        };
        let every = ((profile.layer_height / self.z_step).round() as usize).max(1);
        (model_layer + 1) % every == 0
    }

    /// Priming stroke for one extruder at the purge location, or `None`
    /// when purging is not configured. Strokes are stacked one extrusion
    /// width apart per extruder so they never overwrite each other.
    pub fn purge_line(&self, profile: &ExtruderProfile, extruder: usize) -> Option<Polygon> {
        let location = self.purge_location?;
        let offset = Point2::new(0.0, extruder as f64 * 2.0 * profile.extrusion_width);
        let a = location + offset;
        let b = a + Point2::new(PURGE_LENGTH, 0.0);
        Some(Polygon::from_points(vec![a, b], false, profile.material))
    }

    pub fn set_first_point(&mut self, machine_layer: usize, p: Point2, material: MaterialId) {
        if let Some(ends) = self.ends.get_mut(machine_layer) {
            if ends.first.is_none() {
                ends.first = Some((p, material));
            }
        }
    }

    pub fn set_last_point(&mut self, machine_layer: usize, p: Point2, material: MaterialId) {
        if let Some(ends) = self.ends.get_mut(machine_layer) {
            ends.last = Some((p, material));
        }
    }

    pub fn ends(&self, machine_layer: usize) -> Result<LayerEnds> {
        self.ends
            .get(machine_layer)
            .copied()
            .ok_or(EngineError::LayerOutOfRange {
                layer: machine_layer,
                layers: self.ends.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    fn params_with_heights(heights: &[f64]) -> BuildParams {
        BuildParams {
            machine: MachineConfig {
                foundation_layers: 2,
                ..MachineConfig::default()
            },
            extruders: heights
                .iter()
                .enumerate()
                .map(|(i, h)| ExtruderProfile {
                    material: MaterialId(i as u32),
                    layer_height: *h,
                    ..ExtruderProfile::default()
                })
                .collect(),
            ..BuildParams::default()
        }
    }

    #[test]
    fn test_finest_common_step() {
        let rules = LayerRules::new(&params_with_heights(&[0.2, 0.4]), 2.0).unwrap();
        assert!((rules.z_step() - 0.2).abs() < 1e-12);
        assert_eq!(rules.model_layer_count(), 10);
        assert_eq!(rules.machine_layer_count(), 12);
    }

    #[test]
    fn test_bottom_up_rejected() {
        let mut params = params_with_heights(&[0.2]);
        params.machine.top_down = false;
        assert!(matches!(
            LayerRules::new(&params, 2.0),
            Err(EngineError::UnsupportedDirection)
        ));
    }

    #[test]
    fn test_model_machine_mapping() {
        let rules = LayerRules::new(&params_with_heights(&[0.25]), 1.0).unwrap();
        assert!(rules.is_foundation(0));
        assert!(rules.is_foundation(1));
        assert!(!rules.is_foundation(2));
        assert_eq!(rules.model_layer(2), Some(0));
        assert_eq!(rules.model_layer(5), Some(3));
        // Machine z is monotone in the layer index.
        assert!(rules.machine_z(3) > rules.machine_z(2));
    }

    #[test]
    fn test_hatch_alternates() {
        let rules = LayerRules::new(&params_with_heights(&[0.2]), 1.0).unwrap();
        let a = rules.hatch_angle(4);
        let b = rules.hatch_angle(5);
        assert!(((a - b).abs() - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(rules.hatch_angle(4), rules.hatch_angle(6));
    }

    #[test]
    fn test_coarse_extruder_live_every_other_layer() {
        let params = params_with_heights(&[0.2, 0.4]);
        let rules = LayerRules::new(&params, 2.0).unwrap();
        let coarse = &params.extruders[1];
        let fine = &params.extruders[0];
        // Model layers 0, 1, 2, 3 sit on machine layers 2..6.
        assert!(!rules.extruder_live(coarse, 2));
        assert!(rules.extruder_live(coarse, 3));
        assert!(!rules.extruder_live(coarse, 4));
        assert!(rules.extruder_live(coarse, 5));
        for l in 2..6 {
            assert!(rules.extruder_live(fine, l));
        }
    }

    #[test]
    fn test_purge_lines_stack_per_extruder() {
        let mut params = params_with_heights(&[0.2, 0.2]);
        params.machine.purge_location = Some(Point2::new(-15.0, 0.0));
        let rules = LayerRules::new(&params, 1.0).unwrap();
        let a = rules.purge_line(&params.extruders[0], 0).unwrap();
        let b = rules.purge_line(&params.extruders[1], 1).unwrap();
        assert_eq!(a.first().unwrap(), Point2::new(-15.0, 0.0));
        assert!(b.first().unwrap().y > a.first().unwrap().y);
        assert!((a.perimeter() - 10.0).abs() < 1e-12);

        let no_purge = LayerRules::new(&params_with_heights(&[0.2]), 1.0).unwrap();
        assert!(no_purge.purge_line(&params.extruders[0], 0).is_none());
    }

    #[test]
    fn test_end_bookkeeping() {
        let mut rules = LayerRules::new(&params_with_heights(&[0.2]), 1.0).unwrap();
        rules.set_first_point(3, Point2::new(1.0, 2.0), MaterialId(0));
        rules.set_first_point(3, Point2::new(9.0, 9.0), MaterialId(0));
        rules.set_last_point(3, Point2::new(4.0, 4.0), MaterialId(0));
        let ends = rules.ends(3).unwrap();
        // First point sticks, last point follows the most recent path.
        assert_eq!(ends.first.unwrap().0, Point2::new(1.0, 2.0));
        assert_eq!(ends.last.unwrap().0, Point2::new(4.0, 4.0));
        assert!(rules.ends(99).is_err());
    }
}
