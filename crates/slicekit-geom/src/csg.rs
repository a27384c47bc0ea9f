//! Boolean expression trees over half-planes.
//!
//! Nodes are immutable and shared with `Arc`, so pruned subtrees alias the
//! original tree instead of copying it. `Universe` and `Nothing` are real
//! variants, not sentinels layered on top: the smart constructors fold them
//! away so a pruned tree never carries dead branches.

use std::sync::Arc;

use crate::halfplane::HalfPlane;
use crate::interval::{Interval, IntervalSign};
use crate::point::Point2;
use crate::rect::Rect;

/// Magnitude used for the signed "distance" of the trivial sets.
const FAR: f64 = 1.0e30;

/// A constructive solid geometry expression.
#[derive(Debug, Clone)]
pub enum Csg {
    /// Everything is solid.
    Universe,
    /// Nothing is solid.
    Nothing,
    /// A single half-plane.
    Leaf(HalfPlane),
    /// Solid where both operands are solid.
    Intersection(Arc<Csg>, Arc<Csg>),
    /// Solid where either operand is solid.
    Union(Arc<Csg>, Arc<Csg>),
}

impl Csg {
    pub fn leaf(h: HalfPlane) -> Csg {
        Csg::Leaf(h)
    }

    /// Intersection with identity folding: `Universe` drops out, `Nothing`
    /// absorbs.
    pub fn intersection(a: Csg, b: Csg) -> Csg {
        match (&a, &b) {
            (Csg::Nothing, _) | (_, Csg::Nothing) => Csg::Nothing,
            (Csg::Universe, _) => b,
            (_, Csg::Universe) => a,
            _ => Csg::Intersection(Arc::new(a), Arc::new(b)),
        }
    }

    /// Union with identity folding: `Nothing` drops out, `Universe` absorbs.
    pub fn union(a: Csg, b: Csg) -> Csg {
        match (&a, &b) {
            (Csg::Universe, _) | (_, Csg::Universe) => Csg::Universe,
            (Csg::Nothing, _) => b,
            (_, Csg::Nothing) => a,
            _ => Csg::Union(Arc::new(a), Arc::new(b)),
        }
    }

    /// Set difference `a \ b`.
    pub fn difference(a: Csg, b: Csg) -> Csg {
        Csg::intersection(a, b.complement())
    }

    /// De Morgan complement.
    pub fn complement(&self) -> Csg {
        match self {
            Csg::Universe => Csg::Nothing,
            Csg::Nothing => Csg::Universe,
            Csg::Leaf(h) => Csg::Leaf(h.complement()),
            Csg::Intersection(a, b) => Csg::union(a.complement(), b.complement()),
            Csg::Union(a, b) => Csg::intersection(a.complement(), b.complement()),
        }
    }

    /// Number of half-plane leaves. Rasterization stops subdividing once a
    /// pruned subtree's complexity is small enough to evaluate per pixel.
    pub fn complexity(&self) -> usize {
        match self {
            Csg::Universe | Csg::Nothing => 0,
            Csg::Leaf(_) => 1,
            Csg::Intersection(a, b) | Csg::Union(a, b) => a.complexity() + b.complexity(),
        }
    }

    /// Signed distance-like value at a point; negative inside the solid.
    /// Intersection takes the max of its operands, union the min.
    pub fn value(&self, p: &Point2) -> f64 {
        match self {
            Csg::Universe => -FAR,
            Csg::Nothing => FAR,
            Csg::Leaf(h) => h.value(p),
            Csg::Intersection(a, b) => a.value(p).max(b.value(p)),
            Csg::Union(a, b) => a.value(p).min(b.value(p)),
        }
    }

    /// Is the point inside (or on the boundary of) the solid?
    pub fn contains(&self, p: &Point2) -> bool {
        self.value(p) <= 0.0
    }

    /// Range of `value` over a whole rectangle. A strictly negative result
    /// proves the rectangle uniformly solid, strictly positive uniformly
    /// air.
    pub fn value_over(&self, rect: &Rect) -> Interval {
        match self {
            Csg::Universe => Interval::new(-FAR, -FAR),
            Csg::Nothing => Interval::new(FAR, FAR),
            Csg::Leaf(h) => h.value_over(rect),
            Csg::Intersection(a, b) => a.value_over(rect).max(&b.value_over(rect)),
            Csg::Union(a, b) => a.value_over(rect).min(&b.value_over(rect)),
        }
    }

    /// A logically equivalent but smaller tree, valid only inside `rect`.
    /// Subtrees whose interval over the rectangle is uniformly solid or air
    /// collapse to `Universe`/`Nothing` and the identity folding in the
    /// constructors removes them from the parents.
    pub fn prune(&self, rect: &Rect) -> Csg {
        match self {
            Csg::Universe | Csg::Nothing => self.clone(),
            Csg::Leaf(h) => match h.value_over(rect).sign() {
                IntervalSign::Negative => Csg::Universe,
                IntervalSign::Positive => Csg::Nothing,
                IntervalSign::Mixed => self.clone(),
            },
            Csg::Intersection(a, b) => Csg::intersection(a.prune(rect), b.prune(rect)),
            Csg::Union(a, b) => Csg::union(a.prune(rect), b.prune(rect)),
        }
    }

    /// All half-plane leaves, in expression order.
    pub fn half_planes(&self) -> Vec<HalfPlane> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<HalfPlane>) {
        match self {
            Csg::Universe | Csg::Nothing => {}
            Csg::Leaf(h) => out.push(*h),
            Csg::Intersection(a, b) | Csg::Union(a, b) => {
                a.collect_leaves(out);
                b.collect_leaves(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Csg {
        let a = Point2::new(x0, y0);
        let b = Point2::new(x1, y0);
        let c = Point2::new(x1, y1);
        let d = Point2::new(x0, y1);
        let e1 = Csg::leaf(HalfPlane::through(a, b).unwrap());
        let e2 = Csg::leaf(HalfPlane::through(b, c).unwrap());
        let e3 = Csg::leaf(HalfPlane::through(c, d).unwrap());
        let e4 = Csg::leaf(HalfPlane::through(d, a).unwrap());
        Csg::intersection(Csg::intersection(e1, e2), Csg::intersection(e3, e4))
    }

    #[test]
    fn test_square_membership() {
        let s = square(0.0, 0.0, 2.0, 2.0);
        assert!(s.contains(&Point2::new(1.0, 1.0)));
        assert!(!s.contains(&Point2::new(3.0, 1.0)));
        assert!(!s.contains(&Point2::new(1.0, -0.1)));
    }

    #[test]
    fn test_identity_folding() {
        let s = square(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            Csg::intersection(Csg::Nothing, s.clone()),
            Csg::Nothing
        ));
        assert_eq!(Csg::union(Csg::Nothing, s.clone()).complexity(), 4);
        assert!(matches!(Csg::union(Csg::Universe, s), Csg::Universe));
    }

    #[test]
    fn test_prune_collapses_far_rect() {
        let s = square(0.0, 0.0, 1.0, 1.0);
        let far = Rect::new(Point2::new(10.0, 10.0), Point2::new(11.0, 11.0));
        assert!(matches!(s.prune(&far), Csg::Nothing));

        let inside = Rect::new(Point2::new(0.4, 0.4), Point2::new(0.6, 0.6));
        assert!(matches!(s.prune(&inside), Csg::Universe));

        // Straddling one edge keeps only that edge's leaf.
        let edge = Rect::new(Point2::new(-0.1, 0.4), Point2::new(0.1, 0.6));
        assert_eq!(s.prune(&edge).complexity(), 1);
    }

    #[test]
    fn test_complement_value() {
        let s = square(0.0, 0.0, 1.0, 1.0);
        let c = s.complement();
        let p = Point2::new(0.5, 0.5);
        assert!(s.contains(&p));
        assert!(!c.contains(&p));
    }

    #[test]
    fn test_union_of_disjoint_squares() {
        let u = Csg::union(square(0.0, 0.0, 1.0, 1.0), square(2.0, 0.0, 3.0, 1.0));
        assert!(u.contains(&Point2::new(0.5, 0.5)));
        assert!(u.contains(&Point2::new(2.5, 0.5)));
        assert!(!u.contains(&Point2::new(1.5, 0.5)));
    }
}
