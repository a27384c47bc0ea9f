//! End-to-end pipeline scenarios: two adjacent squares through the whole
//! stack, and an overhang that must receive support below it.

use slicekit_engine::{
    cuboid, BuildParams, ExtruderProfile, MachineConfig, SliceOrchestrator, SliceSource,
};
use slicekit_geom::{MaterialId, Point2, Point3, Rect};

fn test_params() -> BuildParams {
    BuildParams {
        machine: MachineConfig {
            pixels_per_mm: 10.0,
            bed: Rect::new(Point2::new(-20.0, -20.0), Point2::new(60.0, 60.0)),
            foundation_layers: 0,
            purge_location: None,
            top_down: true,
        },
        extruders: vec![ExtruderProfile {
            material: MaterialId(0),
            layer_height: 0.5,
            extrusion_width: 0.5,
            infill_width: 1.0,
            surface_layers: 1,
            arc_compensation: 0.2,
            support_margin: 1.0,
            ..ExtruderProfile::default()
        }],
        ..BuildParams::default()
    }
}

fn mesh_box(x0: f64, y0: f64, z0: f64, side: f64, height: f64) -> SliceSource {
    SliceSource::Mesh {
        triangles: cuboid(
            Point3::new(x0, y0, z0),
            Point3::new(x0 + side, y0 + side, z0 + height),
        ),
        material: MaterialId(0),
    }
}

#[test]
fn test_two_squares_end_to_end() {
    let mut orch = SliceOrchestrator::new(
        test_params(),
        vec![
            mesh_box(0.0, 0.0, 0.0, 5.0, 2.0),
            mesh_box(8.0, 0.0, 0.0, 5.0, 2.0),
        ],
    )
    .unwrap();
    let layers = orch.process_build().unwrap();
    assert_eq!(layers.len(), 4);

    for layer in &layers {
        // Two disjoint squares: one closed outline each.
        assert_eq!(layer.outlines.len(), 2, "layer {}", layer.machine_layer);
        for outline in &layer.outlines {
            assert!(outline.is_closed());
            assert!(outline.area().abs() > 15.0, "outline lost too much area");
            assert!(
                outline.speeds().is_some(),
                "outlines must carry a speed profile"
            );
            assert!(outline.extrude_end().is_some());
        }
        // Nothing overhangs, so nothing bridges and nothing needs support.
        assert!(layer.bridges.is_empty());
        assert!(layer.support.is_empty());
        assert!(!layer.infill.is_empty(), "layer {}", layer.machine_layer);
    }

    // Infill snakes are contiguous zig-zags: a handful of open polygons,
    // not one polygon per hatch line.
    let top = &layers[0];
    for snake in &top.infill {
        assert!(!snake.is_closed());
        assert!(snake.len() >= 4);
    }

    // Top and bottom layers are all-surface: fine hatch at 0.5mm spacing
    // produces clearly more paths-length than the interior layers' 1mm.
    let top_points: usize = layers[0].infill.point_count();
    let mid_points: usize = layers[1].infill.point_count();
    assert!(top_points > mid_points);
}

#[test]
fn test_overhang_gets_support_below() {
    // A 2mm column holding up a wide slab: the slab's overhang has nothing
    // under it, so every layer below the slab must carry support hatch.
    let mut orch = SliceOrchestrator::new(
        test_params(),
        vec![
            mesh_box(0.0, 0.0, 0.0, 2.0, 2.0),       // column
            mesh_box(-3.0, -3.0, 2.0, 8.0, 1.0),     // slab on top, overhanging
        ],
    )
    .unwrap();
    let layers = orch.process_build().unwrap();
    assert_eq!(layers.len(), 6);

    // Layers are produced top-down; the slab occupies machine layers 5..4,
    // the column layers 3..0.
    let below_slab: Vec<_> = layers
        .iter()
        .filter(|l| l.machine_layer < 4)
        .collect();
    assert_eq!(below_slab.len(), 4);
    for layer in below_slab {
        assert!(
            !layer.support.is_empty(),
            "layer {} under the overhang must have support",
            layer.machine_layer
        );
        // Support must reach out under the slab, well outside the column.
        let support_bounds = layer.support.bounds();
        assert!(support_bounds.sw().x < -1.0);
        assert!(support_bounds.ne().x > 3.5);
    }

    // The slab's own layers are not supported by anything above them.
    for layer in layers.iter().filter(|l| l.machine_layer >= 4) {
        assert!(layer.support.is_empty());
    }
}

#[test]
fn test_bridge_between_two_columns() {
    // Two columns with a slab across the top: the span between the columns
    // lands on both, so it bridges rather than asking for support.
    let mut orch = SliceOrchestrator::new(
        test_params(),
        vec![
            mesh_box(0.0, 0.0, 0.0, 2.0, 2.0),
            mesh_box(6.0, 0.0, 0.0, 2.0, 2.0),
            mesh_box(0.0, 0.0, 2.0, 8.0, 0.5),
        ],
    )
    .unwrap();
    let layers = orch.process_build().unwrap();
    let slab_layer = layers
        .iter()
        .find(|l| l.machine_layer == 4)
        .expect("slab layer present");
    assert!(
        !slab_layer.bridges.is_empty(),
        "span between columns must bridge"
    );
}

#[test]
fn test_foundation_layers_carry_the_footprint() {
    let mut params = test_params();
    params.machine.foundation_layers = 2;
    let mut orch =
        SliceOrchestrator::new(params, vec![mesh_box(0.0, 0.0, 0.0, 4.0, 1.0)]).unwrap();
    let layers = orch.process_build().unwrap();
    assert_eq!(layers.len(), 4);

    for layer in layers.iter().filter(|l| l.machine_layer < 2) {
        assert_eq!(layer.outlines.len(), 1);
        // Foundation extends the footprint by the support margin.
        let raft = &layer.outlines[0];
        assert!(raft.area().abs() > 16.0);
        assert!(!layer.infill.is_empty());
    }
}

#[test]
fn test_purge_strokes_lead_each_layer() {
    let mut params = test_params();
    params.machine.purge_location = Some(Point2::new(-15.0, -15.0));
    let mut orch =
        SliceOrchestrator::new(params, vec![mesh_box(0.0, 0.0, 0.0, 4.0, 1.0)]).unwrap();
    let layers = orch.process_build().unwrap();
    for layer in &layers {
        assert_eq!(layer.purge.len(), 1);
        // The purge stroke is the first path of the layer.
        let ends = orch.rules().ends(layer.machine_layer).unwrap();
        assert_eq!(ends.first.unwrap().0, Point2::new(-15.0, -15.0));
    }
}

#[test]
fn test_layer_end_bookkeeping_is_recorded() {
    let mut orch =
        SliceOrchestrator::new(test_params(), vec![mesh_box(0.0, 0.0, 0.0, 5.0, 1.0)]).unwrap();
    let layers = orch.process_build().unwrap();
    for layer in &layers {
        let ends = orch.rules().ends(layer.machine_layer).unwrap();
        assert!(ends.first.is_some());
        assert!(ends.last.is_some());
    }
}
