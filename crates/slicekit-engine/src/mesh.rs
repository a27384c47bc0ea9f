//! Triangle-mesh sectioning: cut a triangle soup with a horizontal plane
//! and stitch the resulting segment soup into closed layer polygons.

use tracing::{debug, warn};

use slicekit_geom::{MaterialId, Point2, Point3, Polygon, PolygonList};

/// One triangle of the input mesh, in model coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
}

impl Triangle {
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    /// Intersection of this triangle with the plane at `z`, as a 2D
    /// segment, or `None` when the plane misses the triangle. The
    /// half-open straddle test keeps vertices lying exactly on the plane
    /// from producing duplicate or degenerate crossings.
    pub fn section(&self, z: f64) -> Option<(Point2, Point2)> {
        let verts = [self.a, self.b, self.c];
        let mut hits: Vec<Point2> = Vec::with_capacity(2);
        for i in 0..3 {
            let p = verts[i];
            let q = verts[(i + 1) % 3];
            if (p.z <= z) == (q.z <= z) {
                continue;
            }
            let t = (z - p.z) / (q.z - p.z);
            hits.push(Point2::new(
                p.x + (q.x - p.x) * t,
                p.y + (q.y - p.y) * t,
            ));
        }
        match hits.len() {
            2 => Some((hits[0], hits[1])),
            _ => None,
        }
    }

    pub fn z_min(&self) -> f64 {
        self.a.z.min(self.b.z).min(self.c.z)
    }

    pub fn z_max(&self) -> f64 {
        self.a.z.max(self.b.z).max(self.c.z)
    }
}

/// Highest z of any vertex in the soup; the model height the layer rules
/// are built from.
pub fn mesh_height(triangles: &[Triangle]) -> f64 {
    triangles.iter().map(Triangle::z_max).fold(0.0, f64::max)
}

/// Cut the soup at `z` and stitch the segments into closed polygons by
/// endpoint matching within `tolerance` (normally one grid pixel). Chains
/// that never close are a mesh defect: logged and dropped, the layer
/// degrades to the loops that did close.
pub fn section_mesh(
    triangles: &[Triangle],
    z: f64,
    tolerance: f64,
    attribute: MaterialId,
) -> PolygonList {
    let segments: Vec<(Point2, Point2)> = triangles
        .iter()
        .filter(|t| t.z_min() <= z && z <= t.z_max())
        .filter_map(|t| t.section(z))
        .collect();
    stitch_segments(segments, z, tolerance, attribute)
}

fn stitch_segments(
    mut segments: Vec<(Point2, Point2)>,
    z: f64,
    tolerance: f64,
    attribute: MaterialId,
) -> PolygonList {
    let mut out = PolygonList::new();
    let tol = tolerance.max(f64::EPSILON);

    while let Some((start, mut tail)) = segments.pop() {
        let mut chain = vec![start, tail];
        // Greedy endpoint matching; segment soups from manifold meshes
        // always chain up, so no backtracking is needed.
        loop {
            let next = segments.iter().position(|(p, q)| {
                p.distance_to(&tail) <= tol || q.distance_to(&tail) <= tol
            });
            let Some(i) = next else {
                break;
            };
            let (p, q) = segments.swap_remove(i);
            tail = if p.distance_to(&tail) <= tol { q } else { p };
            chain.push(tail);
        }
        let closes = chain.len() > 3 && chain[0].distance_to(&tail) <= tol;
        if closes {
            chain.pop();
            out.push(Polygon::from_points(chain, true, attribute));
        } else {
            warn!(
                z,
                points = chain.len(),
                "open section chain dropped, mesh is not watertight here"
            );
        }
    }
    debug!(z, loops = out.len(), "sectioned mesh");
    out
}

/// Triangulated axis-aligned box, the workhorse of the engine tests.
pub fn cuboid(sw: Point3, ne: Point3) -> Vec<Triangle> {
    let (x0, y0, z0) = (sw.x, sw.y, sw.z);
    let (x1, y1, z1) = (ne.x, ne.y, ne.z);
    let v = |x, y, z| Point3::new(x, y, z);
    let quads = [
        // bottom, top
        [v(x0, y0, z0), v(x1, y0, z0), v(x1, y1, z0), v(x0, y1, z0)],
        [v(x0, y0, z1), v(x0, y1, z1), v(x1, y1, z1), v(x1, y0, z1)],
        // sides
        [v(x0, y0, z0), v(x0, y1, z0), v(x0, y1, z1), v(x0, y0, z1)],
        [v(x1, y0, z0), v(x1, y0, z1), v(x1, y1, z1), v(x1, y1, z0)],
        [v(x0, y0, z0), v(x0, y0, z1), v(x1, y0, z1), v(x1, y0, z0)],
        [v(x0, y1, z0), v(x1, y1, z0), v(x1, y1, z1), v(x0, y1, z1)],
    ];
    let mut tris = Vec::with_capacity(12);
    for q in quads {
        tris.push(Triangle::new(q[0], q[1], q[2]));
        tris.push(Triangle::new(q[0], q[2], q[3]));
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_section_crossing() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        );
        let (a, b) = t.section(1.0).unwrap();
        // At half height the cut runs from x=0 to x=1 along y=0.
        let (lo, hi) = if a.x < b.x { (a, b) } else { (b, a) };
        assert!((lo.x - 0.0).abs() < 1e-12);
        assert!((hi.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangle_section_miss() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.5),
        );
        assert!(t.section(2.0).is_none());
    }

    #[test]
    fn test_cuboid_sections_to_square() {
        let tris = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 3.0, 4.0));
        let loops = section_mesh(&tris, 2.0, 1e-6, MaterialId(0));
        assert_eq!(loops.len(), 1);
        let poly = &loops[0];
        assert!(poly.is_closed());
        assert!((poly.area().abs() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_cuboids_give_two_loops() {
        let mut tris = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 2.0));
        tris.extend(cuboid(
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 2.0),
        ));
        let loops = section_mesh(&tris, 1.0, 1e-6, MaterialId(0));
        assert_eq!(loops.len(), 2);
    }

    #[test]
    fn test_open_chain_is_dropped() {
        // A single triangle cannot close a loop.
        let tris = vec![Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        )];
        let loops = section_mesh(&tris, 1.0, 1e-6, MaterialId(0));
        assert!(loops.is_empty());
    }

    #[test]
    fn test_mesh_height() {
        let tris = cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 7.5));
        assert!((mesh_height(&tris) - 7.5).abs() < 1e-12);
    }
}
