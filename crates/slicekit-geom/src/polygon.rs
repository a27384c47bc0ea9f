//! Polygons and polygon lists.
//!
//! A polygon is an ordered vertex sequence, optionally closed, with an
//! optional parallel per-vertex plotting-speed sequence and optional
//! extrude/valve "taper" markers used to shut the feed off a little before
//! a seam. Geometry here is real-world millimetres; pixel-space loops from
//! contour extraction are converted before they get here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::csg::Csg;
use crate::error::{GeomError, Result};
use crate::halfplane::HalfPlane;
use crate::material::MaterialId;
use crate::point::Point2;
use crate::rect::Rect;

/// Marker for tapering extrusion near the end of a path: the vertex index
/// to act at plus the residual distance beyond it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndMarker {
    pub index: usize,
    pub residual: f64,
}

/// Machine limits for [`Polygon::speed_profile`], millimetres and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Full plotting speed on straight runs.
    pub cruise: f64,
    /// Floor speed at a full reversal corner.
    pub corner_min: f64,
    /// Acceleration limit along the path.
    pub acceleration: f64,
}

/// An ordered, optionally closed point sequence with a material tag.
#[derive(Debug, Clone)]
pub struct Polygon {
    points: Vec<Point2>,
    closed: bool,
    speeds: Option<Vec<f64>>,
    attribute: MaterialId,
    extrude_end: Option<EndMarker>,
    valve_end: Option<EndMarker>,
}

impl Polygon {
    pub fn open(attribute: MaterialId) -> Self {
        Self {
            points: Vec::new(),
            closed: false,
            speeds: None,
            attribute,
            extrude_end: None,
            valve_end: None,
        }
    }

    pub fn closed(attribute: MaterialId) -> Self {
        Self {
            closed: true,
            ..Self::open(attribute)
        }
    }

    pub fn from_points(
        points: Vec<Point2>,
        closed: bool,
        attribute: MaterialId,
    ) -> Self {
        Self {
            points,
            closed,
            speeds: None,
            attribute,
            extrude_end: None,
            valve_end: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn attribute(&self) -> MaterialId {
        self.attribute
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn point(&self, i: usize) -> Point2 {
        self.points[i]
    }

    pub fn speeds(&self) -> Option<&[f64]> {
        self.speeds.as_deref()
    }

    pub fn extrude_end(&self) -> Option<EndMarker> {
        self.extrude_end
    }

    pub fn valve_end(&self) -> Option<EndMarker> {
        self.valve_end
    }

    pub fn first(&self) -> Option<Point2> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point2> {
        self.points.last().copied()
    }

    /// Append a point. Speed-carrying polygons must append through
    /// [`Polygon::push_with_speed`]; a plain push would desynchronise the
    /// two sequences. Hard failure in debug builds, warn-and-skip in
    /// release.
    pub fn push(&mut self, p: Point2) {
        if self.speeds.is_some() {
            debug_assert!(
                false,
                "point appended to speed-carrying polygon without a speed"
            );
            warn!("point appended to speed-carrying polygon without a speed, skipped");
            return;
        }
        self.points.push(p);
    }

    /// Append a point with its plotting speed, promoting the polygon to
    /// speed-carrying on first use.
    pub fn push_with_speed(&mut self, p: Point2, speed: f64) -> Result<()> {
        match &mut self.speeds {
            Some(speeds) => {
                if speeds.len() != self.points.len() {
                    return Err(GeomError::MissingSpeed);
                }
                speeds.push(speed);
            }
            None => {
                if !self.points.is_empty() {
                    return Err(GeomError::MissingSpeed);
                }
                self.speeds = Some(vec![speed]);
            }
        }
        self.points.push(p);
        Ok(())
    }

    /// Bounding rectangle of the vertices.
    pub fn bounds(&self) -> Rect {
        let mut r = Rect::empty();
        for p in &self.points {
            r = r.expand_to(p);
        }
        r
    }

    /// Signed area by the shoelace formula; positive for counter-clockwise
    /// winding. Open polygons are treated as if closed.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += a.cross(&b);
        }
        sum * 0.5
    }

    /// Total path length (including the closing edge when closed).
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..self.points.len() - 1 {
            sum += self.points[i].distance_to(&self.points[i + 1]);
        }
        if self.closed {
            sum += self.points[self.points.len() - 1].distance_to(&self.points[0]);
        }
        sum
    }

    /// Reverse the travel direction in place (speeds follow their points).
    pub fn reverse(&mut self) {
        self.points.reverse();
        if let Some(s) = &mut self.speeds {
            s.reverse();
        }
        self.extrude_end = None;
        self.valve_end = None;
    }

    /// Index of the vertex nearest to `p`.
    pub fn nearest_vertex_to(&self, p: &Point2) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_to(p)
                    .partial_cmp(&b.distance_to(p))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Rotate a closed polygon so it starts (and seams) at vertex `i`.
    pub fn with_start(&self, i: usize) -> Polygon {
        if !self.closed || i == 0 || i >= self.points.len() {
            return self.clone();
        }
        let mut points = Vec::with_capacity(self.points.len());
        points.extend_from_slice(&self.points[i..]);
        points.extend_from_slice(&self.points[..i]);
        let speeds = self.speeds.as_ref().map(|s| {
            let mut v = Vec::with_capacity(s.len());
            v.extend_from_slice(&s[i..]);
            v.extend_from_slice(&s[..i]);
            v
        });
        Polygon {
            points,
            closed: true,
            speeds,
            attribute: self.attribute,
            extrude_end: None,
            valve_end: None,
        }
    }

    /// Place the extrude-taper marker `over_run` millimetres of travel
    /// before the end of the path.
    pub fn set_extrude_end(&mut self, over_run: f64) {
        self.extrude_end = self.marker_before_end(over_run);
    }

    /// Place the valve-taper marker `over_run` millimetres before the end.
    pub fn set_valve_end(&mut self, over_run: f64) {
        self.valve_end = self.marker_before_end(over_run);
    }

    fn marker_before_end(&self, over_run: f64) -> Option<EndMarker> {
        if self.points.len() < 2 || over_run <= 0.0 {
            return None;
        }
        let mut remaining = over_run;
        let mut i = self.points.len() - 1;
        while i > 0 {
            let seg = self.points[i - 1].distance_to(&self.points[i]);
            if seg >= remaining {
                return Some(EndMarker {
                    index: i - 1,
                    residual: seg - remaining,
                });
            }
            remaining -= seg;
            i -= 1;
        }
        // Whole path shorter than the over-run; taper from the start.
        Some(EndMarker {
            index: 0,
            residual: 0.0,
        })
    }

    /// Assign per-vertex plotting speeds: a cornering speed from the turn
    /// angle at each vertex, clamped by forward/backward acceleration
    /// passes so no edge demands more than the machine can change over its
    /// length. Edges long enough to reach full speed and slow down again
    /// get intermediate vertices inserted, giving the emitter a
    /// trapezoidal profile instead of a single ramp.
    pub fn speed_profile(&self, params: &SpeedParams) -> Polygon {
        let n = self.points.len();
        if n < 2 || params.cruise <= 0.0 {
            return self.clone();
        }
        let accel = params.acceleration.max(f64::EPSILON);
        let mut v = vec![params.corner_min; n];
        for i in 0..n {
            let (prev, next) = if self.closed {
                (self.points[(i + n - 1) % n], self.points[(i + 1) % n])
            } else if i == 0 || i == n - 1 {
                continue;
            } else {
                (self.points[i - 1], self.points[i + 1])
            };
            let din = (self.points[i] - prev).unit();
            let dout = (next - self.points[i]).unit();
            // 1.0 straight through, 0.0 full reversal.
            let straightness = (1.0 + din.dot(&dout)) * 0.5;
            v[i] = params.corner_min + (params.cruise - params.corner_min) * straightness;
        }

        let edges = if self.closed { n } else { n - 1 };
        let edge_len =
            |e: usize| self.points[e].distance_to(&self.points[(e + 1) % n]);
        // Closed paths need a second sweep so limits propagate across the
        // seam at vertex 0.
        let sweeps = if self.closed { 2 } else { 1 };
        for _ in 0..sweeps {
            for e in 0..edges {
                let j = (e + 1) % n;
                let cap = (v[e] * v[e] + 2.0 * accel * edge_len(e)).sqrt();
                v[j] = v[j].min(cap);
            }
            for e in (0..edges).rev() {
                let j = (e + 1) % n;
                let cap = (v[j] * v[j] + 2.0 * accel * edge_len(e)).sqrt();
                v[e] = v[e].min(cap);
            }
        }

        let mut points = Vec::with_capacity(n + edges);
        let mut speeds = Vec::with_capacity(n + edges);
        let cruise2 = params.cruise * params.cruise;
        for i in 0..n {
            points.push(self.points[i]);
            speeds.push(v[i]);
            if i >= edges {
                break;
            }
            let j = (i + 1) % n;
            let d = edge_len(i);
            if d <= f64::EPSILON {
                continue;
            }
            let dir = (self.points[j] - self.points[i]).unit();
            let (vi2, vj2) = (v[i] * v[i], v[j] * v[j]);
            // Speed-squared where the acceleration and deceleration ramps
            // meet if the edge were one long ramp each way.
            let peak2 = (vi2 + vj2 + 2.0 * accel * d) * 0.5;
            if peak2 >= cruise2 {
                let d_acc = (cruise2 - vi2) / (2.0 * accel);
                let d_dec = (cruise2 - vj2) / (2.0 * accel);
                if d_acc > f64::EPSILON {
                    points.push(self.points[i] + dir.scale(d_acc));
                    speeds.push(params.cruise);
                }
                if d_dec > f64::EPSILON && d - d_dec > d_acc + f64::EPSILON {
                    points.push(self.points[i] + dir.scale(d - d_dec));
                    speeds.push(params.cruise);
                }
            } else if peak2 > vi2.max(vj2) + 1e-12 {
                let d_peak = (peak2 - vi2) / (2.0 * accel);
                if d_peak > f64::EPSILON && d_peak < d - f64::EPSILON {
                    points.push(self.points[i] + dir.scale(d_peak));
                    speeds.push(peak2.sqrt());
                }
            }
        }

        Polygon {
            points,
            closed: self.closed,
            speeds: Some(speeds),
            attribute: self.attribute,
            extrude_end: None,
            valve_end: None,
        }
    }

    /// Douglas-style simplification per the anchor/binary-search scheme:
    /// from each anchor, keep the farthest vertex such that every skipped
    /// vertex lies within `tolerance` of the straight replacement segment.
    /// Closed polygons rotate to an extreme vertex first so the wrap-around
    /// edge is simplified like any other.
    pub fn simplify(&self, tolerance: f64) -> Polygon {
        if tolerance <= 0.0 || self.points.len() < 3 {
            return self.clone();
        }
        let base = if self.closed {
            let anchor = self.extreme_vertex();
            self.with_start(anchor)
        } else {
            self.clone()
        };
        let pts = &base.points;
        let n = pts.len();
        // Virtual index n is the start point again for closed polygons.
        let last = if base.closed { n } else { n - 1 };

        let mut kept = vec![0usize];
        let mut i = 0usize;
        while i < last {
            let mut lo = i + 1;
            let mut hi = last;
            // Largest j whose chord covers all intermediates within tolerance.
            while lo < hi {
                let mid = (lo + hi + 1) / 2;
                if Self::chord_ok(pts, i, mid, n, tolerance) {
                    lo = mid;
                } else {
                    hi = mid - 1;
                }
            }
            if lo < last {
                kept.push(lo);
            }
            i = lo;
        }
        if !base.closed {
            kept.push(n - 1);
        }

        let points: Vec<Point2> = kept.iter().map(|&k| pts[k % n]).collect();
        Polygon {
            points,
            closed: base.closed,
            speeds: None,
            attribute: base.attribute,
            extrude_end: None,
            valve_end: None,
        }
    }

    fn chord_ok(pts: &[Point2], i: usize, j: usize, n: usize, tolerance: f64) -> bool {
        let a = pts[i % n];
        let b = pts[j % n];
        let ab = b - a;
        let len2 = ab.norm_squared();
        for k in i + 1..j {
            let p = pts[k % n];
            let dev = if len2 <= f64::EPSILON {
                p.distance_to(&a)
            } else {
                (ab.cross(&(p - a))).abs() / len2.sqrt()
            };
            if dev > tolerance {
                return false;
            }
        }
        true
    }

    /// Index of the lowest-then-leftmost vertex; always a convex corner, so
    /// it can never be simplified away.
    fn extreme_vertex(&self) -> usize {
        let mut best = 0usize;
        for (i, p) in self.points.iter().enumerate() {
            let q = self.points[best];
            if p.y < q.y || (p.y == q.y && p.x < q.x) {
                best = i;
            }
        }
        best
    }

    /// Convex hull of the vertices as a closed counter-clockwise polygon.
    pub fn convex_hull(&self) -> Polygon {
        let hull = hull_of(&self.points);
        Polygon::from_points(hull, true, self.attribute)
    }

    /// Convert a closed polygon to a CSG expression of its interior, by
    /// peeling successive convex-hull layers (Tang & Woo): each hull edge
    /// whose endpoints are consecutive on the ring contributes its
    /// half-plane directly; each skipped sub-chain contributes the
    /// complement of its own recursively converted pocket.
    pub fn to_csg(&self) -> Result<Csg> {
        if self.points.len() < 3 {
            return Err(GeomError::TooFewPoints {
                count: self.points.len(),
                needed: 3,
            });
        }
        let mut ring: Vec<Point2> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if ring.last().map(|q: &Point2| q.distance_to(p) > 1e-9).unwrap_or(true) {
                ring.push(*p);
            }
        }
        if ring.len() >= 2 && ring[0].distance_to(&ring[ring.len() - 1]) <= 1e-9 {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(GeomError::TooFewPoints {
                count: ring.len(),
                needed: 3,
            });
        }
        Ok(ring_to_csg(&ring))
    }
}

/// Degenerate-area cutoff below which a ring contributes no solid.
const FLAT_RING: f64 = 1e-9;

fn ring_area(ring: &[Point2]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        sum += ring[i].cross(&ring[(i + 1) % ring.len()]);
    }
    sum * 0.5
}

/// Tang & Woo conversion of one closed ring. Runs on an explicit stack of
/// (ring, slot) jobs would obscure the alternation here; the recursion depth
/// is bounded by the hull-layer count, which shrinks by at least one vertex
/// per level.
fn ring_to_csg(ring: &[Point2]) -> Csg {
    let area = ring_area(ring);
    if area.abs() < FLAT_RING {
        return Csg::Nothing;
    }
    let ring: Vec<Point2> = if area < 0.0 {
        ring.iter().rev().copied().collect()
    } else {
        ring.to_vec()
    };
    let n = ring.len();
    let hull = hull_of(&ring);
    // Mark ring positions that are hull vertices; for a simple polygon the
    // hull vertices occur in ring order.
    let mut hull_idx: Vec<usize> = Vec::with_capacity(hull.len());
    for (i, p) in ring.iter().enumerate() {
        if hull.iter().any(|h| h.distance_to(p) <= 1e-9) {
            hull_idx.push(i);
        }
    }
    if hull_idx.len() < 3 {
        return Csg::Nothing;
    }

    let mut acc = Csg::Universe;
    for k in 0..hull_idx.len() {
        let i = hull_idx[k];
        let j = hull_idx[(k + 1) % hull_idx.len()];
        let edge = match HalfPlane::through(ring[i], ring[j]) {
            Ok(h) => Csg::leaf(h),
            Err(_) => continue, // coincident hull points
        };
        acc = Csg::intersection(acc, edge);
        let gap = (j + n - i) % n;
        if gap > 1 {
            // Pocket between the chain i..j and the hull edge j->i.
            let mut sub: Vec<Point2> = Vec::with_capacity(gap + 1);
            let mut t = i;
            loop {
                sub.push(ring[t]);
                if t == j {
                    break;
                }
                t = (t + 1) % n;
            }
            let pocket = ring_to_csg(&sub);
            acc = Csg::intersection(acc, pocket.complement());
        }
    }
    acc
}

/// Convex hull, counter-clockwise, by incremental farthest-point insertion:
/// repeatedly add the point with the greatest outside distance from the
/// current hull's edge set, then discard vertices the insertion made
/// concave.
pub fn hull_of(points: &[Point2]) -> Vec<Point2> {
    let mut pts: Vec<Point2> = Vec::new();
    for p in points {
        if !pts.iter().any(|q| q.distance_to(p) <= 1e-9) {
            pts.push(*p);
        }
    }
    if pts.len() <= 2 {
        return pts;
    }

    // Seed with the two X extremes; every hull contains both.
    let mut lo = 0usize;
    let mut hi = 0usize;
    for (i, p) in pts.iter().enumerate() {
        if (p.x, p.y) < (pts[lo].x, pts[lo].y) {
            lo = i;
        }
        if (p.x, p.y) > (pts[hi].x, pts[hi].y) {
            hi = i;
        }
    }
    let mut hull = vec![pts[lo], pts[hi]];

    // Each pass inserts a distinct extreme point, so the point count bounds
    // the iteration.
    for _ in 0..pts.len() {
        // Farthest point strictly outside any current hull edge.
        let mut best: Option<(f64, usize, usize)> = None;
        for (pi, p) in pts.iter().enumerate() {
            for e in 0..hull.len() {
                let a = hull[e];
                let b = hull[(e + 1) % hull.len()];
                let ab = b - a;
                let len = ab.norm();
                if len <= 1e-12 {
                    continue;
                }
                // Negative cross = right of the CCW edge = outside.
                let d = -ab.cross(&(*p - a)) / len;
                if d > 1e-9 && best.map(|(bd, _, _)| d > bd).unwrap_or(true) {
                    best = Some((d, pi, e));
                }
            }
        }
        let Some((_, pi, e)) = best else { break };
        hull.insert(e + 1, pts[pi]);

        // Discard vertices the insertion made concave.
        let mut changed = true;
        while changed && hull.len() > 3 {
            changed = false;
            let mut k = 0;
            while k < hull.len() && hull.len() > 3 {
                let a = hull[(k + hull.len() - 1) % hull.len()];
                let b = hull[k];
                let c = hull[(k + 1) % hull.len()];
                if (b - a).cross(&(c - b)) <= 1e-12 {
                    hull.remove(k);
                    changed = true;
                } else {
                    k += 1;
                }
            }
        }
    }
    hull
}

/// An unordered collection of polygons from one layer.
#[derive(Debug, Clone, Default)]
pub struct PolygonList {
    polygons: Vec<Polygon>,
}

impl PolygonList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, p: Polygon) {
        self.polygons.push(p);
    }

    pub fn append(&mut self, mut other: PolygonList) {
        self.polygons.append(&mut other.polygons);
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Polygon> {
        self.polygons.iter_mut()
    }

    pub fn as_slice(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Combined bounding rectangle.
    pub fn bounds(&self) -> Rect {
        let mut r = Rect::empty();
        for p in &self.polygons {
            r = r.union(&p.bounds());
        }
        r
    }

    /// Total vertex count across all member polygons.
    pub fn point_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }
}

impl std::ops::Index<usize> for PolygonList {
    type Output = Polygon;
    fn index(&self, i: usize) -> &Polygon {
        &self.polygons[i]
    }
}

impl<'a> IntoIterator for &'a PolygonList {
    type Item = &'a Polygon;
    type IntoIter = std::slice::Iter<'a, Polygon>;
    fn into_iter(self) -> Self::IntoIter {
        self.polygons.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: f64) -> Polygon {
        Polygon::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(w, 0.0),
                Point2::new(w, w),
                Point2::new(0.0, w),
            ],
            true,
            MaterialId(0),
        )
    }

    #[test]
    fn test_area_and_winding() {
        let s = square(2.0);
        assert!((s.area() - 4.0).abs() < 1e-12);
        let mut r = s.clone();
        r.reverse();
        assert!((r.area() + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_push_with_speed_invariant() {
        let mut p = Polygon::open(MaterialId(0));
        p.push_with_speed(Point2::new(0.0, 0.0), 10.0).unwrap();
        p.push_with_speed(Point2::new(1.0, 0.0), 12.0).unwrap();
        assert_eq!(p.speeds().unwrap().len(), 2);

        let mut q = Polygon::open(MaterialId(0));
        q.push(Point2::new(0.0, 0.0));
        assert!(matches!(
            q.push_with_speed(Point2::new(1.0, 0.0), 5.0),
            Err(GeomError::MissingSpeed)
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "speed-carrying")]
    fn test_push_on_speed_carrying_polygon_is_refused() {
        let mut p = Polygon::open(MaterialId(0));
        p.push_with_speed(Point2::new(0.0, 0.0), 10.0).unwrap();
        p.push(Point2::new(1.0, 0.0));
    }

    #[test]
    fn test_simplify_staircase() {
        // A staircase along a diagonal with 0.1 steps collapses to its
        // endpoints at a 0.2 tolerance.
        let mut p = Polygon::open(MaterialId(0));
        for i in 0..20 {
            let base = i as f64 * 0.1;
            p.push(Point2::new(base, base));
            p.push(Point2::new(base + 0.1, base));
        }
        let s = p.simplify(0.2);
        assert!(s.len() <= 3);
        // Every original vertex stays within tolerance of the chord.
        let a = s.first().unwrap();
        let b = s.last().unwrap();
        let ab = b - a;
        for q in p.points() {
            let dev = (ab.cross(&(*q - a))).abs() / ab.norm();
            assert!(dev <= 0.2 + 1e-9);
        }
    }

    #[test]
    fn test_simplify_never_grows() {
        let s = square(1.0);
        assert!(s.simplify(0.01).len() <= s.len());
    }

    #[test]
    fn test_convex_hull_contains_all_points() {
        let mut p = Polygon::open(MaterialId(0));
        let pts = [
            (0.0, 0.0),
            (2.0, 0.1),
            (4.0, 0.0),
            (3.9, 2.0),
            (4.0, 4.0),
            (1.0, 3.9),
            (0.0, 4.0),
            (2.0, 2.0), // interior
            (1.0, 1.5), // interior
        ];
        for (x, y) in pts {
            p.push(Point2::new(x, y));
        }
        let hull = p.convex_hull();
        assert!(hull.is_closed());
        let csg = hull.to_csg().unwrap();
        for (x, y) in pts {
            assert!(
                csg.value(&Point2::new(x, y)) <= 1e-6,
                "({x}, {y}) escaped the hull"
            );
        }
        // The hull is its own hull.
        assert_eq!(hull.convex_hull().len(), hull.len());
    }

    #[test]
    fn test_to_csg_convex() {
        let s = square(2.0);
        let csg = s.to_csg().unwrap();
        assert!(csg.contains(&Point2::new(1.0, 1.0)));
        assert!(!csg.contains(&Point2::new(2.5, 1.0)));
        assert!(!csg.contains(&Point2::new(-0.5, 1.0)));
    }

    #[test]
    fn test_to_csg_notched_square() {
        // Square with a notch cut into the top edge; non-convex, exercises
        // the hull-layer peeling.
        let p = Polygon::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 4.0),
                Point2::new(3.0, 4.0),
                Point2::new(3.0, 3.0),
                Point2::new(1.0, 3.0),
                Point2::new(1.0, 4.0),
                Point2::new(0.0, 4.0),
            ],
            true,
            MaterialId(0),
        );
        let csg = p.to_csg().unwrap();
        assert!(csg.contains(&Point2::new(2.0, 1.0)));
        assert!(csg.contains(&Point2::new(0.5, 3.5)));
        assert!(csg.contains(&Point2::new(3.5, 3.5)));
        assert!(!csg.contains(&Point2::new(2.0, 3.5))); // inside the notch
        assert!(!csg.contains(&Point2::new(5.0, 1.0)));
    }

    #[test]
    fn test_end_markers() {
        let mut p = Polygon::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            false,
            MaterialId(0),
        );
        p.set_extrude_end(4.0);
        let m = p.extrude_end().unwrap();
        assert_eq!(m.index, 1);
        assert!((m.residual - 6.0).abs() < 1e-9);

        p.set_valve_end(25.0); // longer than the whole path
        let v = p.valve_end().unwrap();
        assert_eq!(v.index, 0);
    }

    #[test]
    fn test_with_start_rotation() {
        let s = square(1.0);
        let r = s.with_start(2);
        assert_eq!(r.point(0), Point2::new(1.0, 1.0));
        assert_eq!(r.len(), 4);
        assert!((r.area() - s.area()).abs() < 1e-12);
    }

    #[test]
    fn test_speed_profile_slows_for_corners() {
        let params = SpeedParams {
            cruise: 30.0,
            corner_min: 5.0,
            acceleration: 500.0,
        };
        let p = square(10.0).speed_profile(&params);
        let speeds = p.speeds().unwrap();
        assert_eq!(speeds.len(), p.len());
        // Right-angle corners sit halfway between floor and cruise, and the
        // 10mm edges are long enough for cruise plateaus in between.
        for (i, pt) in p.points().iter().enumerate() {
            let original_corner = square(10.0).points().contains(pt);
            if original_corner {
                assert!(speeds[i] < params.cruise, "corner at full speed");
                assert!(speeds[i] >= params.corner_min - 1e-9);
            }
        }
        assert!(speeds.iter().any(|s| (*s - params.cruise).abs() < 1e-9));
    }

    #[test]
    fn test_speed_profile_respects_acceleration() {
        let params = SpeedParams {
            cruise: 40.0,
            corner_min: 2.0,
            acceleration: 100.0,
        };
        let p = Polygon::from_points(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 0.0),
                Point2::new(5.0, 5.0),
            ],
            false,
            MaterialId(0),
        )
        .speed_profile(&params);
        let pts = p.points();
        let speeds = p.speeds().unwrap();
        for i in 0..pts.len() - 1 {
            let d = pts[i].distance_to(&pts[i + 1]);
            let dv2 = (speeds[i + 1] * speeds[i + 1] - speeds[i] * speeds[i]).abs();
            assert!(
                dv2 <= 2.0 * params.acceleration * d + 1e-6,
                "edge {i} exceeds the acceleration limit"
            );
        }
    }

    #[test]
    fn test_speed_profile_short_edges_never_reach_cruise() {
        let params = SpeedParams {
            cruise: 60.0,
            corner_min: 5.0,
            acceleration: 10.0,
        };
        let p = square(1.0).speed_profile(&params);
        for s in p.speeds().unwrap() {
            assert!(*s < params.cruise);
        }
    }
}
