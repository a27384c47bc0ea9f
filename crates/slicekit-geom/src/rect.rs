//! Axis-aligned rectangles in real (millimetre) coordinates.

use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::point::Point2;

/// An axis-aligned rectangle, closed under union/intersection/offset.
/// The empty rectangle is explicit (`Rect::empty()`), never a degenerate
/// sliver: invariant `sw <= ne` on both axes whenever non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    sw: Point2,
    ne: Point2,
    empty: bool,
}

impl Rect {
    /// Rectangle from any two opposite corners.
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            sw: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            ne: Point2::new(a.x.max(b.x), a.y.max(b.y)),
            empty: false,
        }
    }

    /// Rectangle from its X and Y extents. Empty if either is empty.
    pub fn from_intervals(x: Interval, y: Interval) -> Self {
        if x.is_empty() || y.is_empty() {
            return Self::empty();
        }
        Self::new(Point2::new(x.low, y.low), Point2::new(x.high, y.high))
    }

    pub fn empty() -> Self {
        Self {
            sw: Point2::default(),
            ne: Point2::default(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// South-west (minimum) corner.
    pub fn sw(&self) -> Point2 {
        self.sw
    }

    /// North-east (maximum) corner.
    pub fn ne(&self) -> Point2 {
        self.ne
    }

    /// North-west corner.
    pub fn nw(&self) -> Point2 {
        Point2::new(self.sw.x, self.ne.y)
    }

    /// South-east corner.
    pub fn se(&self) -> Point2 {
        Point2::new(self.ne.x, self.sw.y)
    }

    pub fn centre(&self) -> Point2 {
        (self.sw + self.ne).scale(0.5)
    }

    /// Extent along X as an interval.
    pub fn x_interval(&self) -> Interval {
        if self.empty {
            Interval::empty()
        } else {
            Interval::new(self.sw.x, self.ne.x)
        }
    }

    /// Extent along Y as an interval.
    pub fn y_interval(&self) -> Interval {
        if self.empty {
            Interval::empty()
        } else {
            Interval::new(self.sw.y, self.ne.y)
        }
    }

    pub fn width(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            self.ne.x - self.sw.x
        }
    }

    pub fn height(&self) -> f64 {
        if self.empty {
            0.0
        } else {
            self.ne.y - self.sw.y
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, p: &Point2) -> bool {
        !self.empty
            && self.sw.x <= p.x
            && p.x <= self.ne.x
            && self.sw.y <= p.y
            && p.y <= self.ne.y
    }

    /// Smallest rectangle covering both operands.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.empty {
            return *other;
        }
        if other.empty {
            return *self;
        }
        Rect::from_intervals(
            self.x_interval().union(&other.x_interval()),
            self.y_interval().union(&other.y_interval()),
        )
    }

    /// Overlap of the two rectangles.
    pub fn intersection(&self, other: &Rect) -> Rect {
        if self.empty || other.empty {
            return Rect::empty();
        }
        Rect::from_intervals(
            self.x_interval().intersection(&other.x_interval()),
            self.y_interval().intersection(&other.y_interval()),
        )
    }

    /// Expand (positive `d`) or contract (negative `d`) all four sides.
    /// Contracting past the centre yields the empty rectangle.
    pub fn offset(&self, d: f64) -> Rect {
        if self.empty {
            return *self;
        }
        let grow = Point2::new(d, d);
        let sw = self.sw - grow;
        let ne = self.ne + grow;
        if sw.x > ne.x || sw.y > ne.y {
            return Rect::empty();
        }
        Rect { sw, ne, empty: false }
    }

    /// Grow just enough to cover `p`.
    pub fn expand_to(&self, p: &Point2) -> Rect {
        if self.empty {
            return Rect::new(*p, *p);
        }
        Rect::new(
            Point2::new(self.sw.x.min(p.x), self.sw.y.min(p.y)),
            Point2::new(self.ne.x.max(p.x), self.ne.y.max(p.y)),
        )
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.empty {
            write!(f, "[empty]")
        } else {
            write!(
                f,
                "[{:.3},{:.3}..{:.3},{:.3}]",
                self.sw.x, self.sw.y, self.ne.x, self.ne.y
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(ax: f64, ay: f64, bx: f64, by: f64) -> Rect {
        Rect::new(Point2::new(ax, ay), Point2::new(bx, by))
    }

    #[test]
    fn test_corner_normalisation() {
        let a = r(5.0, 5.0, 1.0, 1.0);
        assert_eq!(a.sw(), Point2::new(1.0, 1.0));
        assert_eq!(a.ne(), Point2::new(5.0, 5.0));
    }

    #[test]
    fn test_union_intersection() {
        let a = r(0.0, 0.0, 2.0, 2.0);
        let b = r(1.0, 1.0, 3.0, 3.0);
        assert_eq!(a.union(&b), r(0.0, 0.0, 3.0, 3.0));
        assert_eq!(a.intersection(&b), r(1.0, 1.0, 2.0, 2.0));

        let c = r(10.0, 10.0, 11.0, 11.0);
        assert!(a.intersection(&c).is_empty());
    }

    #[test]
    fn test_offset_collapse() {
        let a = r(0.0, 0.0, 2.0, 2.0);
        assert_eq!(a.offset(1.0), r(-1.0, -1.0, 3.0, 3.0));
        assert!(a.offset(-1.5).is_empty());
    }

    #[test]
    fn test_empty_identities() {
        let a = r(0.0, 0.0, 1.0, 1.0);
        let e = Rect::empty();
        assert_eq!(a.union(&e), a);
        assert!(a.intersection(&e).is_empty());
        assert!(!e.contains(&Point2::new(0.0, 0.0)));
    }
}
