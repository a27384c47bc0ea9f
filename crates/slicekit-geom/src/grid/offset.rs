//! Morphological grow/shrink by capsule stamping.
//!
//! Every perimeter edge gets a capsule (rectangle plus two end discs) of
//! the offset radius stamped onto the grid: growing stamps solid outward,
//! shrinking stamps an erosion band which is then subtracted. A post-pass
//! clears single-pixel whiskers the stamping can leave behind.

use tracing::debug;

use crate::point::Point2;

use super::PixelGrid;

impl PixelGrid {
    /// Offset the solid region by `distance` (positive grows, negative
    /// shrinks). The result's backing rectangle is enlarged as needed for
    /// growth; shrinking stays on the original rectangle.
    pub fn offset(&self, distance: f64) -> PixelGrid {
        let px = self.res.pixel_size();
        if self.is_nothing() || distance.abs() < 0.5 * px {
            return self.clone();
        }
        // Unsimplified perimeters: capsules must follow the pixel boundary,
        // not a smoothed version of it.
        let perimeters = self.contours(0.0);
        let r = distance.abs();
        let mut out = if distance > 0.0 {
            self.windowed(self.rect.offset(r + px))
        } else {
            self.clone()
        };
        if distance > 0.0 {
            for poly in &perimeters {
                let pts = poly.points();
                for i in 0..pts.len() {
                    let a = pts[i];
                    let b = pts[(i + 1) % pts.len()];
                    out.stamp_capsule(a, b, r, true);
                }
            }
        } else {
            let mut band = PixelGrid::filled(self.rect, self.res, self.attribute, false);
            for poly in &perimeters {
                let pts = poly.points();
                for i in 0..pts.len() {
                    let a = pts[i];
                    let b = pts[(i + 1) % pts.len()];
                    band.stamp_capsule(a, b, r, true);
                }
            }
            out = PixelGrid::difference(&out, &band);
        }
        out.remove_whiskers();
        debug!(distance, solid = out.count_solid(), "offset grid");
        out
    }

    /// Stamp all pixels within `r` of the segment `a`..`b`.
    fn stamp_capsule(&mut self, a: Point2, b: Point2, r: f64, solid: bool) {
        let lo = Point2::new(a.x.min(b.x) - r, a.y.min(b.y) - r);
        let hi = Point2::new(a.x.max(b.x) + r, a.y.max(b.y) + r);
        let p0 = self.pixel_of(&lo);
        let p1 = self.pixel_of(&hi);
        let ab = b - a;
        let len2 = ab.norm_squared();
        let r2 = r * r;
        for y in p0.y.max(0)..=p1.y.min(self.height - 1) {
            for x in p0.x.max(0)..=p1.x.min(self.width - 1) {
                let c = self.pixel_centre(x, y);
                let t = if len2 <= f64::EPSILON {
                    0.0
                } else {
                    ((c - a).dot(&ab) / len2).clamp(0.0, 1.0)
                };
                let nearest = a + ab.scale(t);
                if (c - nearest).norm_squared() <= r2 {
                    self.set(x, y, solid);
                }
            }
        }
    }

    /// Clear solid pixels with at most one solid 4-neighbour, repeating
    /// until stable. Stamping along near-parallel edges can leave these
    /// one-pixel whiskers.
    fn remove_whiskers(&mut self) {
        loop {
            let mut cleared = 0usize;
            for y in 0..self.height {
                for x in 0..self.width {
                    if !self.get(x, y) {
                        continue;
                    }
                    let neighbours = [(1, 0), (-1, 0), (0, 1), (0, -1)]
                        .iter()
                        .filter(|(dx, dy)| self.get(x + dx, y + dy))
                        .count();
                    if neighbours <= 1 {
                        self.set(x, y, false);
                        cleared += 1;
                    }
                }
            }
            if cleared == 0 {
                break;
            }
        }
    }
}
