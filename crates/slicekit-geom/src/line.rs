//! Parametric 2D lines.

use crate::error::{GeomError, Result};
use crate::point::Point2;

/// A parametric line `origin + t * direction`. The direction is kept as
/// built (not normalised); half-planes construct lines with unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    origin: Point2,
    direction: Point2,
}

impl Line {
    /// Line through `a` and `b`, parameterised so `t=0` is `a` and `t=1` is `b`.
    pub fn through(a: Point2, b: Point2) -> Self {
        Self {
            origin: a,
            direction: b - a,
        }
    }

    pub fn new(origin: Point2, direction: Point2) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> Point2 {
        self.origin
    }

    pub fn direction(&self) -> Point2 {
        self.direction
    }

    /// The point at parameter `t`.
    pub fn point_at(&self, t: f64) -> Point2 {
        self.origin + self.direction.scale(t)
    }

    /// Parameter of the orthogonal projection of `p` onto the line.
    pub fn nearest(&self, p: &Point2) -> f64 {
        let d2 = self.direction.norm_squared();
        if d2 <= f64::EPSILON {
            return 0.0;
        }
        (*p - self.origin).dot(&self.direction) / d2
    }

    /// Parameter at which this line crosses `other`.
    pub fn cross_parameter(&self, other: &Line) -> Result<f64> {
        let det = other.direction.cross(&self.direction);
        if det.abs() <= f64::EPSILON {
            return Err(GeomError::Parallel("line crossing".to_string()));
        }
        let delta = self.origin - other.origin;
        Ok(other.direction.cross(&delta) / -det)
    }

    /// Crossing point of two lines.
    pub fn cross_point(&self, other: &Line) -> Result<Point2> {
        Ok(self.point_at(self.cross_parameter(other)?))
    }

    /// Same line traversed the opposite way.
    pub fn reversed(&self) -> Line {
        Line {
            origin: self.origin,
            direction: -self.direction,
        }
    }

    /// Parallel line shifted `d` to the left of the travel direction.
    pub fn offset(&self, d: f64) -> Line {
        let shift = self.direction.unit().orthogonal().scale(d);
        Line {
            origin: self.origin + shift,
            direction: self.direction,
        }
    }
}
