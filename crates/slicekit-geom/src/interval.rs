//! Closed real intervals with an explicit empty state.
//!
//! Intervals carry the result of evaluating a signed-distance expression
//! over a whole rectangle: a strictly negative interval means "everything
//! solid", strictly positive means "everything air", and a mixed sign means
//! the boundary passes through the box.

use serde::{Deserialize, Serialize};

/// A closed interval `[low, high]`. Empty when `low > high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

/// Sign classification of an interval, used by CSG pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSign {
    /// Entire interval is negative (inside the solid).
    Negative,
    /// Entire interval is positive (outside the solid).
    Positive,
    /// The interval straddles zero.
    Mixed,
}

impl Interval {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// The canonical empty interval.
    pub fn empty() -> Self {
        Self {
            low: 1.0,
            high: -1.0,
        }
    }

    /// An interval covering every value either operand can take.
    pub fn big() -> Self {
        Self {
            low: f64::MIN * 0.5,
            high: f64::MAX * 0.5,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    pub fn length(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        !self.is_empty() && self.low <= v && v <= self.high
    }

    /// Smallest interval containing both operands.
    pub fn union(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval::new(self.low.min(other.low), self.high.max(other.high))
    }

    /// Overlap of the two intervals; empty when they are disjoint.
    pub fn intersection(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::empty();
        }
        Interval::new(self.low.max(other.low), self.high.min(other.high))
    }

    /// Interval addition: the range of `a + b` over both operands.
    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::empty();
        }
        Interval::new(self.low + other.low, self.high + other.high)
    }

    /// Shift by a scalar.
    pub fn offset(&self, d: f64) -> Interval {
        if self.is_empty() {
            return *self;
        }
        Interval::new(self.low + d, self.high + d)
    }

    /// Range of `s * x` for `x` in this interval.
    pub fn scale(&self, s: f64) -> Interval {
        if self.is_empty() {
            return *self;
        }
        let a = self.low * s;
        let b = self.high * s;
        Interval::new(a.min(b), a.max(b))
    }

    /// Pointwise maximum of the two ranges (the interval of `max(a, b)`).
    pub fn max(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval::new(self.low.max(other.low), self.high.max(other.high))
    }

    /// Pointwise minimum of the two ranges (the interval of `min(a, b)`).
    pub fn min(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval::new(self.low.min(other.low), self.high.min(other.high))
    }

    /// Negated interval (the range of `-x`).
    pub fn negate(&self) -> Interval {
        if self.is_empty() {
            return *self;
        }
        Interval::new(-self.high, -self.low)
    }

    /// Sign classification; empty intervals classify as `Mixed` so callers
    /// never treat them as uniformly solid or air.
    pub fn sign(&self) -> IntervalSign {
        if self.is_empty() {
            IntervalSign::Mixed
        } else if self.high < 0.0 {
            IntervalSign::Negative
        } else if self.low > 0.0 {
            IntervalSign::Positive
        } else {
            IntervalSign::Mixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_behaviour() {
        let e = Interval::empty();
        assert!(e.is_empty());
        assert_eq!(e.length(), 0.0);
        assert!(!e.contains(0.0));

        let a = Interval::new(1.0, 2.0);
        assert_eq!(a.union(&e), a);
        assert!(a.intersection(&e).is_empty());
    }

    #[test]
    fn test_sign() {
        assert_eq!(Interval::new(-2.0, -1.0).sign(), IntervalSign::Negative);
        assert_eq!(Interval::new(1.0, 2.0).sign(), IntervalSign::Positive);
        assert_eq!(Interval::new(-1.0, 1.0).sign(), IntervalSign::Mixed);
        assert_eq!(Interval::empty().sign(), IntervalSign::Mixed);
    }

    #[test]
    fn test_arithmetic() {
        let a = Interval::new(-1.0, 2.0);
        let b = Interval::new(3.0, 4.0);
        assert_eq!(a.add(&b), Interval::new(2.0, 6.0));
        assert_eq!(a.scale(-2.0), Interval::new(-4.0, 2.0));
        assert_eq!(a.negate(), Interval::new(-2.0, 1.0));
        assert_eq!(a.max(&b), Interval::new(3.0, 4.0));
        assert_eq!(a.min(&b), Interval::new(-1.0, 2.0));
    }
}
