//! Hatch-line generation and "snake" stitching for infill.
//!
//! A hatch is a family of equally spaced parallel scan lines clipped to the
//! solid region. Each line is walked with a fixed-increment DDA collecting
//! solid/air transition pairs; consecutive lines' segments are then
//! stitched into zig-zag snakes by following the outward pixel boundary
//! from the end of one segment to the start of the next, giving the
//! extruder one continuous path instead of a move per line. Boundary
//! walks that run out of unvisited neighbours inside the step budget
//! yield no connection and the snake simply ends there.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::point::{Point2, Point2i};
use crate::polygon::{Polygon, PolygonList};

use super::PixelGrid;

/// Parameters of one hatch pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HatchParams {
    /// Distance between adjacent scan lines, millimetres.
    pub spacing: f64,
    /// Direction of the scan lines, radians from the X axis.
    pub angle: f64,
    /// Optional end-joining pass over the stitched snakes.
    pub join: Option<SnakeJoinParams>,
}

/// Tuned thresholds for merging independent snakes whose ends face each
/// other across a gap. The defaults are inherited settings, not derived
/// values; keep them configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnakeJoinParams {
    /// Maximum end-to-end gap, millimetres (about one hatch spacing).
    pub max_gap: f64,
    /// Maximum angle between the gap vector and the hatch normal, radians.
    pub alignment_tol: f64,
}

impl SnakeJoinParams {
    pub fn for_spacing(spacing: f64) -> Self {
        Self {
            max_gap: spacing,
            alignment_tol: 0.05,
        }
    }
}

/// One clipped scan-line segment awaiting stitching.
struct HatchSegment {
    a: Point2,
    b: Point2,
    a_px: Point2i,
    b_px: Point2i,
    used: bool,
}

/// Endpoint key: which segment and which end.
#[derive(Clone, Copy)]
struct EndRef {
    seg: usize,
    at_a: bool,
}

const NEIGHBOURS_8: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl PixelGrid {
    /// Hatch the solid region and stitch the result into snakes.
    pub fn hatch(&self, params: &HatchParams) -> PolygonList {
        let mut out = PolygonList::new();
        if self.is_nothing() || params.spacing <= 0.0 {
            return out;
        }
        let dir = Point2::new(params.angle.cos(), params.angle.sin());
        let normal = dir.orthogonal();
        let lines = self.scan_lines(dir, normal, params.spacing);
        let total: usize = lines.iter().map(|l| l.len()).sum();
        if total == 0 {
            return out;
        }
        let snakes = self.stitch(lines, dir, params.spacing);
        let px = self.res.pixel_size();
        let mut polys: Vec<Polygon> = snakes
            .into_iter()
            .map(|s| s.simplify(0.8 * px))
            .collect();
        if let Some(join) = &params.join {
            polys = join_snakes(polys, normal, join);
        }
        for p in polys {
            if p.len() >= 2 {
                out.push(p);
            }
        }
        debug!(
            segments = total,
            snakes = out.len(),
            spacing = params.spacing,
            "hatched grid"
        );
        out
    }

    /// Clip every scan line of the family to the solid region with a DDA
    /// walk at pixel pitch.
    fn scan_lines(
        &self,
        dir: Point2,
        normal: Point2,
        spacing: f64,
    ) -> Vec<Vec<HatchSegment>> {
        let corners = [
            self.rect.sw(),
            self.rect.se(),
            self.rect.ne(),
            self.rect.nw(),
        ];
        let n_lo = corners.iter().map(|c| c.dot(&normal)).fold(f64::MAX, f64::min);
        let n_hi = corners.iter().map(|c| c.dot(&normal)).fold(f64::MIN, f64::max);
        let count = ((n_hi - n_lo) / spacing).ceil() as usize;
        let step = self.res.pixel_size();

        let mut lines = Vec::with_capacity(count);
        for k in 0..count {
            let c = n_lo + (k as f64 + 0.5) * spacing;
            let origin = normal.scale(c);
            let t_lo = corners
                .iter()
                .map(|p| (*p - origin).dot(&dir))
                .fold(f64::MAX, f64::min);
            let t_hi = corners
                .iter()
                .map(|p| (*p - origin).dot(&dir))
                .fold(f64::MIN, f64::max);

            let mut segs: Vec<HatchSegment> = Vec::new();
            let mut entry: Option<Point2> = None;
            let mut prev_solid_at: Option<Point2> = None;
            let steps = ((t_hi - t_lo) / step) as usize + 2;
            for i in 0..steps {
                let t = t_lo + i as f64 * step;
                let p = origin + dir.scale(t);
                if self.value(&p) {
                    if entry.is_none() {
                        entry = Some(p);
                    }
                    prev_solid_at = Some(p);
                } else if let (Some(a), Some(b)) = (entry.take(), prev_solid_at.take()) {
                    segs.push(self.make_segment(a, b));
                }
            }
            if let (Some(a), Some(b)) = (entry, prev_solid_at) {
                segs.push(self.make_segment(a, b));
            }
            lines.push(segs);
        }
        lines
    }

    fn make_segment(&self, a: Point2, b: Point2) -> HatchSegment {
        HatchSegment {
            a,
            b,
            a_px: self.pixel_of(&a),
            b_px: self.pixel_of(&b),
            used: false,
        }
    }

    /// Stitch segments of consecutive lines into snakes.
    fn stitch(
        &self,
        mut lines: Vec<Vec<HatchSegment>>,
        dir: Point2,
        spacing: f64,
    ) -> Vec<Polygon> {
        let px = self.res.pixel_size();
        let cap = ((3.0 * spacing / px).ceil() as usize).max(8) + 16;
        let mut snakes = Vec::new();

        for start_line in 0..lines.len() {
            for start_seg in 0..lines[start_line].len() {
                if lines[start_line][start_seg].used {
                    continue;
                }
                let mut snake = Polygon::open(self.attribute);
                let mut line_idx = start_line;
                let mut seg_idx = start_seg;
                let mut from_a = true;
                loop {
                    let (exit_px, exit_dir) = {
                        let seg = &mut lines[line_idx][seg_idx];
                        seg.used = true;
                        if from_a {
                            snake.push(seg.a);
                            snake.push(seg.b);
                            (seg.b_px, dir)
                        } else {
                            snake.push(seg.b);
                            snake.push(seg.a);
                            (seg.a_px, -dir)
                        }
                    };
                    let next_line = line_idx + 1;
                    if next_line >= lines.len() {
                        break;
                    }
                    let targets = endpoint_map(&lines[next_line]);
                    if targets.is_empty() {
                        break;
                    }
                    let Some((path, hit)) =
                        self.boundary_walk(exit_px, exit_dir, &targets, cap)
                    else {
                        break;
                    };
                    // Connector follows the boundary pixels between the two
                    // segment ends; the later simplify pass flattens it.
                    for q in path.iter().skip(1) {
                        snake.push(self.pixel_centre(q.x, q.y));
                    }
                    line_idx = next_line;
                    seg_idx = hit.seg;
                    from_a = hit.at_a;
                }
                if snake.len() >= 2 {
                    snakes.push(snake);
                }
            }
        }
        snakes
    }

    /// Follow the outward boundary from `start`, trying both rotational
    /// senses, until an endpoint of an unused segment on the adjacent line
    /// is reached. `None` when the walk dead-ends or exceeds `cap` steps.
    fn boundary_walk(
        &self,
        start: Point2i,
        start_dir: Point2,
        targets: &HashMap<(i32, i32), EndRef>,
        cap: usize,
    ) -> Option<(Vec<Point2i>, EndRef)> {
        for clockwise in [false, true] {
            let mut path = vec![start];
            let mut visited: SmallVec<[(i32, i32); 64]> = SmallVec::new();
            visited.push((start.x, start.y));
            let mut cur = start;
            // Seed the incoming direction from the hatch travel direction.
            let mut in_dir = quantise_dir(start_dir);
            let mut found = None;
            for _ in 0..cap {
                if let Some(&hit) = targets.get(&(cur.x, cur.y)) {
                    found = Some(hit);
                    break;
                }
                // A target anywhere in the Moore neighbourhood is taken
                // directly. The rotational scan below can reach a
                // corner-adjacent pixel and step diagonally past the corner
                // pixel holding the endpoint, which would strand the last
                // scan line of the region in its own snake.
                if let Some((next, hit)) = adjacent_target(cur, targets) {
                    path.push(next);
                    found = Some(hit);
                    break;
                }
                let Some(next) = self.next_boundary_pixel(cur, in_dir, clockwise, &visited)
                else {
                    break;
                };
                in_dir = (next.x - cur.x, next.y - cur.y);
                cur = next;
                visited.push((cur.x, cur.y));
                path.push(cur);
            }
            if let Some(hit) = found {
                return Some((path, hit));
            }
        }
        None
    }

    /// Next unvisited boundary pixel around `cur`, scanning the Moore
    /// neighbourhood in rotational order starting just past the direction
    /// we came from.
    fn next_boundary_pixel(
        &self,
        cur: Point2i,
        in_dir: (i32, i32),
        clockwise: bool,
        visited: &[(i32, i32)],
    ) -> Option<Point2i> {
        let back = (-in_dir.0, -in_dir.1);
        let start = NEIGHBOURS_8
            .iter()
            .position(|&d| d == back)
            .unwrap_or(0);
        for i in 1..=NEIGHBOURS_8.len() {
            let idx = if clockwise {
                (start + NEIGHBOURS_8.len() - i) % NEIGHBOURS_8.len()
            } else {
                (start + i) % NEIGHBOURS_8.len()
            };
            let (dx, dy) = NEIGHBOURS_8[idx];
            let (nx, ny) = (cur.x + dx, cur.y + dy);
            if !self.get(nx, ny) || visited.contains(&(nx, ny)) {
                continue;
            }
            if self.is_boundary(nx, ny) {
                return Some(Point2i::new(nx, ny));
            }
        }
        None
    }

    /// Solid pixel with at least one air neighbour.
    fn is_boundary(&self, x: i32, y: i32) -> bool {
        self.get(x, y)
            && NEIGHBOURS_8
                .iter()
                .any(|(dx, dy)| !self.get(x + dx, y + dy))
    }
}

fn adjacent_target(
    cur: Point2i,
    targets: &HashMap<(i32, i32), EndRef>,
) -> Option<(Point2i, EndRef)> {
    NEIGHBOURS_8.iter().find_map(|&(dx, dy)| {
        targets
            .get(&(cur.x + dx, cur.y + dy))
            .map(|&hit| (Point2i::new(cur.x + dx, cur.y + dy), hit))
    })
}

fn endpoint_map(segs: &[HatchSegment]) -> HashMap<(i32, i32), EndRef> {
    let mut map = HashMap::new();
    for (i, s) in segs.iter().enumerate() {
        if s.used {
            continue;
        }
        map.insert((s.a_px.x, s.a_px.y), EndRef { seg: i, at_a: true });
        map.insert((s.b_px.x, s.b_px.y), EndRef { seg: i, at_a: false });
    }
    map
}

fn quantise_dir(d: Point2) -> (i32, i32) {
    let q = |v: f64| {
        if v > 0.3 {
            1
        } else if v < -0.3 {
            -1
        } else {
            0
        }
    };
    let u = d.unit();
    (q(u.x), q(u.y))
}

/// Merge snakes whose facing ends are within `max_gap` of each other and
/// whose gap runs along the hatch normal.
fn join_snakes(
    mut snakes: Vec<Polygon>,
    normal: Point2,
    params: &SnakeJoinParams,
) -> Vec<Polygon> {
    let aligned = |gap: Point2| -> bool {
        if gap.norm() <= f64::EPSILON {
            return true;
        }
        // Angle between the gap and the hatch normal, compared by sine.
        gap.unit().cross(&normal).abs() <= params.alignment_tol.sin().abs()
    };

    let mut merged_any = true;
    while merged_any {
        merged_any = false;
        'outer: for i in 0..snakes.len() {
            for j in 0..snakes.len() {
                if i == j {
                    continue;
                }
                let (Some(end_i), Some(start_j)) = (snakes[i].last(), snakes[j].first())
                else {
                    continue;
                };
                let gap = start_j - end_i;
                if gap.norm() <= params.max_gap && aligned(gap) {
                    let tail = snakes.remove(j);
                    let keep = if j < i { i - 1 } else { i };
                    for p in tail.points() {
                        snakes[keep].push(*p);
                    }
                    merged_any = true;
                    break 'outer;
                }
            }
        }
    }
    snakes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialId;
    use crate::rect::Rect;

    use super::super::GridResolution;

    fn solid_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> PixelGrid {
        let window = Rect::new(
            Point2::new(x0 - 0.3, y0 - 0.3),
            Point2::new(x1 + 0.3, y1 + 0.3),
        );
        let mut g = PixelGrid::filled(window, GridResolution::new(10.0), MaterialId(0), false);
        for y in 0..g.height() {
            for x in 0..g.width() {
                let c = g.pixel_centre(x, y);
                if c.x >= x0 && c.x <= x1 && c.y >= y0 && c.y <= y1 {
                    g.set(x, y, true);
                }
            }
        }
        g
    }

    #[test]
    fn test_hatch_single_rect_is_one_snake() {
        let g = solid_rect(0.0, 0.0, 4.0, 2.0);
        let params = HatchParams {
            spacing: 0.5,
            angle: 0.0,
            join: None,
        };
        let hatch = g.hatch(&params);
        assert_eq!(hatch.len(), 1, "rectangle should stitch into one snake");
        let snake = &hatch[0];
        assert!(!snake.is_closed());
        // Four scan lines cross the 2mm-tall rectangle; simplification
        // collapses the boundary connectors, leaving about two points per
        // line.
        let line_count = 4;
        assert!(snake.len() >= line_count * 2);
        assert!(snake.len() <= line_count * 2 + 2 * line_count);
    }

    #[test]
    fn test_stitch_reaches_the_last_scan_line() {
        // The connector to the final scan line turns a corner of the
        // region; the walk must land on the corner pixel instead of
        // stepping diagonally past it and stranding the line.
        let g = solid_rect(0.0, 0.0, 4.0, 2.0);
        let hatch = g.hatch(&HatchParams {
            spacing: 0.5,
            angle: 0.0,
            join: None,
        });
        assert_eq!(hatch.len(), 1);
        let top = hatch[0]
            .points()
            .iter()
            .map(|p| p.y)
            .fold(f64::MIN, f64::max);
        assert!(top > 1.5, "topmost scan line missing from the snake");
    }

    #[test]
    fn test_hatch_spacing_controls_line_count() {
        let g = solid_rect(0.0, 0.0, 4.0, 4.0);
        let coarse = g
            .hatch(&HatchParams {
                spacing: 1.0,
                angle: 0.0,
                join: None,
            })
            .point_count();
        let fine = g
            .hatch(&HatchParams {
                spacing: 0.25,
                angle: 0.0,
                join: None,
            })
            .point_count();
        assert!(fine > coarse * 2);
    }

    #[test]
    fn test_hatch_disjoint_regions_make_separate_snakes() {
        let window = Rect::new(Point2::new(0.0, 0.0), Point2::new(6.0, 2.0));
        let mut g = PixelGrid::filled(window, GridResolution::new(10.0), MaterialId(0), false);
        for y in 2..18 {
            for x in 2..18 {
                g.set(x, y, true);
            }
            for x in 40..58 {
                g.set(x, y, true);
            }
        }
        let hatch = g.hatch(&HatchParams {
            spacing: 0.4,
            angle: 0.0,
            join: None,
        });
        assert_eq!(hatch.len(), 2);
    }

    #[test]
    fn test_hatch_empty_grid() {
        let g = PixelGrid::nothing(GridResolution::new(10.0), MaterialId(0));
        let hatch = g.hatch(&HatchParams {
            spacing: 0.5,
            angle: 1.0,
            join: None,
        });
        assert!(hatch.is_empty());
    }

    #[test]
    fn test_vertical_hatch() {
        let g = solid_rect(0.0, 0.0, 2.0, 4.0);
        let hatch = g.hatch(&HatchParams {
            spacing: 0.5,
            angle: std::f64::consts::FRAC_PI_2,
            join: None,
        });
        assert_eq!(hatch.len(), 1);
        // Scan lines run vertically, so consecutive points alternate along Y.
        let snake = &hatch[0];
        let first = snake.point(0);
        let second = snake.point(1);
        assert!((second.y - first.y).abs() > (second.x - first.x).abs());
    }

    #[test]
    fn test_join_snakes_merges_aligned_ends() {
        let a = Polygon::from_points(
            vec![Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)],
            false,
            MaterialId(0),
        );
        let b = Polygon::from_points(
            vec![Point2::new(2.0, 0.4), Point2::new(0.0, 0.4)],
            false,
            MaterialId(0),
        );
        let joined = join_snakes(
            vec![a, b],
            Point2::new(0.0, 1.0),
            &SnakeJoinParams {
                max_gap: 0.5,
                alignment_tol: 0.05,
            },
        );
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].len(), 4);
    }
}
