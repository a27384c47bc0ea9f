//! 2D points and vectors.
//!
//! `Point2` doubles as a vector; the slicing code never needed the
//! distinction and keeping one type avoids a conversion layer. All values
//! are immutable and `Copy`, so sharing is free and there is no aliasing to
//! guard against.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point (or vector) with X and Y coordinates in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a new point with the given X and Y coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product.
    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product; positive when `other` lies
    /// counter-clockwise of `self`.
    pub fn cross(&self, other: &Point2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Squared length; cheaper when only comparisons are needed.
    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Unit vector in this direction. Zero-length input is returned
    /// unchanged rather than producing NaNs.
    pub fn unit(&self) -> Point2 {
        let n = self.norm();
        if n <= f64::EPSILON {
            *self
        } else {
            Point2::new(self.x / n, self.y / n)
        }
    }

    /// Perpendicular vector (rotated 90 degrees counter-clockwise).
    pub fn orthogonal(&self) -> Point2 {
        Point2::new(-self.y, self.x)
    }

    /// Distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        (*other - *self).norm()
    }

    /// Component-wise multiplication by a scalar.
    pub fn scale(&self, s: f64) -> Point2 {
        Point2::new(self.x * s, self.y * s)
    }
}

impl Add for Point2 {
    type Output = Point2;
    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point2 {
    type Output = Point2;
    fn neg(self) -> Point2 {
        Point2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;
    fn mul(self, rhs: f64) -> Point2 {
        self.scale(rhs)
    }
}

/// A point in 3D, used only as slicing input (triangle vertices).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drops the z coordinate.
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// An integer pixel coordinate, relative to a grid's backing rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point2i {
    pub x: i32,
    pub y: i32,
}

impl Point2i {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point2i {
    type Output = Point2i;
    fn add(self, rhs: Point2i) -> Point2i {
        Point2i::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2i {
    type Output = Point2i;
    fn sub(self, rhs: Point2i) -> Point2i {
        Point2i::new(self.x - rhs.x, self.y - rhs.y)
    }
}
