//! Half-planes: the primitive leaves of the CSG tree.
//!
//! A half-plane is `normal . p + offset <= 0` for the solid side, with
//! `normal` kept at unit length. Each half-plane caches a parametric form
//! of its boundary line so crossing tests and hatch walks do not rebuild it.

use crate::error::{GeomError, Result};
use crate::interval::Interval;
use crate::line::Line;
use crate::point::{Point2, Point3};
use crate::rect::Rect;

/// A 2D half-plane; immutable and freely cloneable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    normal: Point2,
    offset: f64,
    /// Boundary line, unit direction, solid side on the left of travel.
    line: Line,
}

impl HalfPlane {
    /// Half-plane whose boundary runs from `a` to `b`, solid on the left of
    /// travel. A counter-clockwise polygon boundary therefore encloses its
    /// interior.
    pub fn through(a: Point2, b: Point2) -> Result<Self> {
        let d = b - a;
        if d.norm() <= f64::EPSILON {
            return Err(GeomError::Parallel("degenerate edge".to_string()));
        }
        let dir = d.unit();
        // Outward normal: right of travel, so interior evaluates negative.
        let normal = -dir.orthogonal();
        let offset = -normal.dot(&a);
        Ok(Self {
            normal,
            offset,
            line: Line::new(a, dir),
        })
    }

    /// Direct construction; `normal` is normalised and `offset` rescaled to
    /// match.
    pub fn from_normal_offset(normal: Point2, offset: f64) -> Result<Self> {
        let n = normal.norm();
        if n <= f64::EPSILON {
            return Err(GeomError::Parallel("zero normal".to_string()));
        }
        let unit = normal.scale(1.0 / n);
        let off = offset / n;
        // Boundary passes through the normal's foot point.
        let foot = unit.scale(-off);
        Ok(Self {
            normal: unit,
            offset: off,
            line: Line::new(foot, unit.orthogonal()),
        })
    }

    /// Section of a 3D half-space `n . p + d <= 0` by the plane at height
    /// `z`. Fails when the half-space's boundary is parallel to the slicing
    /// plane (its normal has no XY component).
    pub fn from_halfspace_at(normal3: Point3, d: f64, z: f64) -> Result<Self> {
        let flat = Point2::new(normal3.x, normal3.y);
        if flat.norm() <= f64::EPSILON {
            return Err(GeomError::ParallelSlice { z });
        }
        Self::from_normal_offset(flat, normal3.z * z + d)
    }

    /// Unit outward normal.
    pub fn normal(&self) -> Point2 {
        self.normal
    }

    /// Scalar offset of the normalised plane equation.
    pub fn plane_offset(&self) -> f64 {
        self.offset
    }

    /// Cached parametric boundary line.
    pub fn line(&self) -> Line {
        self.line
    }

    /// Signed distance of `p` from the boundary; negative inside the solid.
    pub fn value(&self, p: &Point2) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Range of the signed distance over a whole rectangle, by interval
    /// arithmetic on the plane equation.
    pub fn value_over(&self, rect: &Rect) -> Interval {
        if rect.is_empty() {
            return Interval::empty();
        }
        rect.x_interval()
            .scale(self.normal.x)
            .add(&rect.y_interval().scale(self.normal.y))
            .offset(self.offset)
    }

    /// Parallel plane shifted so the solid side grows by `d`.
    pub fn offset(&self, d: f64) -> HalfPlane {
        HalfPlane {
            normal: self.normal,
            offset: self.offset - d,
            line: self.line.offset(-d),
        }
    }

    /// The other side of the same boundary.
    pub fn complement(&self) -> HalfPlane {
        HalfPlane {
            normal: -self.normal,
            offset: -self.offset,
            line: self.line.reversed(),
        }
    }

    /// Crossing point of the two boundary lines.
    pub fn cross_point(&self, other: &HalfPlane) -> Result<Point2> {
        let det = self.normal.cross(&other.normal);
        if det.abs() <= f64::EPSILON {
            return Err(GeomError::Parallel("half-plane crossing".to_string()));
        }
        self.line.cross_point(&other.line)
    }

    /// Restrict a parameter interval of `line` to this half-plane's solid
    /// side. This is the primitive behind both CSG pruning and hatch-line
    /// clipping.
    pub fn wipe(&self, line: &Line, range: Interval) -> Interval {
        if range.is_empty() {
            return range;
        }
        let c = self.value(&line.origin());
        let slope = self.normal.dot(&line.direction());
        if slope.abs() <= f64::EPSILON {
            // Parallel travel: either all of it is solid or none is.
            return if c <= 0.0 { range } else { Interval::empty() };
        }
        let t_cross = -c / slope;
        let solid = if slope > 0.0 {
            Interval::new(f64::MIN * 0.5, t_cross)
        } else {
            Interval::new(t_cross, f64::MAX * 0.5)
        };
        range.intersection(&solid)
    }
}
