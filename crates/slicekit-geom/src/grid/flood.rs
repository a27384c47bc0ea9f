//! Connected-region isolation by flood fill.
//!
//! The fill is iterative with an explicit stack; large grids must not be
//! able to overflow the call stack.

use crate::point::{Point2, Point2i};

use super::PixelGrid;

impl PixelGrid {
    /// The 4-connected solid region containing `seed`, as a new grid on the
    /// same backing rectangle. Returns `nothing` if the seed pixel is air.
    pub fn flood_from(&self, seed: Point2i) -> PixelGrid {
        if !self.get(seed.x, seed.y) {
            return PixelGrid::nothing(self.res, self.attribute);
        }
        let mut out = PixelGrid::filled(self.rect, self.res, self.attribute, false);
        let mut stack = vec![seed];
        out.set(seed.x, seed.y, true);
        while let Some(p) = stack.pop() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (p.x + dx, p.y + dy);
                if self.get(nx, ny) && !out.get(nx, ny) {
                    out.set(nx, ny, true);
                    stack.push(Point2i::new(nx, ny));
                }
            }
        }
        out
    }

    /// All 4-connected solid regions, each as its own grid.
    pub fn connected_regions(&self) -> Vec<PixelGrid> {
        let mut regions = Vec::new();
        if self.is_nothing() {
            return regions;
        }
        let mut claimed = PixelGrid::filled(self.rect, self.res, self.attribute, false);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) && !claimed.get(x, y) {
                    let region = self.flood_from(Point2i::new(x, y));
                    claimed = PixelGrid::union(&claimed, &region);
                    regions.push(region);
                }
            }
        }
        regions
    }

    /// Centroid of the solid pixels in real-world coordinates, or `None`
    /// when there are none.
    pub fn centroid(&self) -> Option<Point2> {
        let mut sum = Point2::default();
        let mut count = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    sum = sum + self.pixel_centre(x, y);
                    count += 1;
                }
            }
        }
        (count > 0).then(|| sum.scale(1.0 / count as f64))
    }
}
