//! Rasterization of CSG expressions by quadtree subdivision.
//!
//! The subdivision runs on an explicit work queue rather than the call
//! stack, so pathological trees on large grids cannot overflow it. At each
//! tile the expression's interval over the tile decides uniform fill/skip;
//! mixed tiles are pruned and either evaluated per pixel (once simple
//! enough or small enough) or split further.

use tracing::debug;

use crate::csg::Csg;
use crate::interval::IntervalSign;
use crate::material::MaterialId;
use crate::rect::Rect;

use super::{GridResolution, PixelGrid};

/// Below this leaf count a tile is evaluated pixel by pixel instead of
/// being subdivided further.
const SIMPLE_ENOUGH: usize = 6;

/// Tiles at or below this pixel count are never worth splitting.
const SMALL_TILE: i32 = 64;

struct Tile {
    x0: i32,
    y0: i32,
    w: i32,
    h: i32,
    expr: Csg,
}

impl PixelGrid {
    /// Rasterize a CSG expression onto `rect` at the given resolution.
    pub fn from_csg(rect: Rect, res: GridResolution, attribute: MaterialId, expr: &Csg) -> Self {
        let mut grid = PixelGrid::filled(rect, res, attribute, false);
        if grid.is_nothing() {
            return grid;
        }
        let root = Tile {
            x0: 0,
            y0: 0,
            w: grid.width,
            h: grid.height,
            expr: expr.prune(&rect),
        };
        let mut queue = vec![root];
        let mut tiles_seen = 0usize;
        while let Some(tile) = queue.pop() {
            tiles_seen += 1;
            grid.raster_tile(tile, &mut queue);
        }
        debug!(
            tiles = tiles_seen,
            solid = grid.count_solid(),
            rect = %rect,
            "rasterized CSG expression"
        );
        grid
    }

    fn tile_rect(&self, x0: i32, y0: i32, w: i32, h: i32) -> Rect {
        Rect::new(self.pixel_corner(x0, y0), self.pixel_corner(x0 + w, y0 + h))
    }

    fn raster_tile(&mut self, tile: Tile, queue: &mut Vec<Tile>) {
        let Tile { x0, y0, w, h, expr } = tile;
        let rect = self.tile_rect(x0, y0, w, h);
        match expr.value_over(&rect).sign() {
            IntervalSign::Positive => {} // uniformly air
            IntervalSign::Negative => {
                for y in y0..y0 + h {
                    self.fill_run(y, x0, x0 + w - 1, true);
                }
            }
            IntervalSign::Mixed => {
                if expr.complexity() <= SIMPLE_ENOUGH || w * h <= SMALL_TILE {
                    self.raster_pixels(x0, y0, w, h, &expr);
                } else {
                    self.split_tile(x0, y0, w, h, &expr, queue);
                }
            }
        }
    }

    fn raster_pixels(&mut self, x0: i32, y0: i32, w: i32, h: i32, expr: &Csg) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                if expr.contains(&self.pixel_centre(x, y)) {
                    self.set(x, y, true);
                }
            }
        }
    }

    /// Push the sub-tiles of a mixed tile, each with a freshly pruned
    /// expression. Degenerate strips split in two instead of four.
    fn split_tile(&self, x0: i32, y0: i32, w: i32, h: i32, expr: &Csg, queue: &mut Vec<Tile>) {
        let halves_x: &[(i32, i32)] = if w > 1 {
            &[(0, 0), (1, 0)]
        } else {
            &[(0, 0)]
        };
        let wl = if w > 1 { w / 2 } else { w };
        let hl = if h > 1 { h / 2 } else { h };
        for &(ix, _) in halves_x {
            let (cx, cw) = if ix == 0 { (x0, wl) } else { (x0 + wl, w - wl) };
            let rows: &[i32] = if h > 1 { &[0, 1] } else { &[0] };
            for &iy in rows {
                let (cy, ch) = if iy == 0 { (y0, hl) } else { (y0 + hl, h - hl) };
                let child_rect = self.tile_rect(cx, cy, cw, ch);
                let pruned = expr.prune(&child_rect);
                if matches!(pruned, Csg::Nothing) {
                    continue;
                }
                queue.push(Tile {
                    x0: cx,
                    y0: cy,
                    w: cw,
                    h: ch,
                    expr: pruned,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halfplane::HalfPlane;
    use crate::point::Point2;

    fn res() -> GridResolution {
        GridResolution::new(10.0)
    }

    fn square_csg(x0: f64, y0: f64, x1: f64, y1: f64) -> Csg {
        let a = Point2::new(x0, y0);
        let b = Point2::new(x1, y0);
        let c = Point2::new(x1, y1);
        let d = Point2::new(x0, y1);
        Csg::intersection(
            Csg::intersection(
                Csg::leaf(HalfPlane::through(a, b).unwrap()),
                Csg::leaf(HalfPlane::through(b, c).unwrap()),
            ),
            Csg::intersection(
                Csg::leaf(HalfPlane::through(c, d).unwrap()),
                Csg::leaf(HalfPlane::through(d, a).unwrap()),
            ),
        )
    }

    #[test]
    fn test_unit_square_raster() {
        let window = Rect::new(Point2::new(-1.0, -1.0), Point2::new(2.0, 2.0));
        let g = PixelGrid::from_csg(window, res(), MaterialId(0), &square_csg(0.0, 0.0, 1.0, 1.0));
        assert!(g.value(&Point2::new(0.5, 0.5)));
        assert!(!g.value(&Point2::new(-0.5, 0.5)));
        assert!(!g.value(&Point2::new(1.5, 1.5)));
        // 1mm x 1mm at 10 px/mm.
        assert_eq!(g.count_solid(), 100);
    }

    #[test]
    fn test_raster_matches_per_pixel_evaluation() {
        let window = Rect::new(Point2::new(-0.5, -0.5), Point2::new(3.5, 2.5));
        let expr = Csg::union(
            square_csg(0.0, 0.0, 1.2, 1.7),
            square_csg(1.0, 0.3, 3.0, 2.0),
        );
        let g = PixelGrid::from_csg(window, res(), MaterialId(0), &expr);
        for y in 0..g.height() {
            for x in 0..g.width() {
                let want = expr.contains(&g.pixel_centre(x, y));
                assert_eq!(g.get(x, y), want, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_empty_expression() {
        let window = Rect::new(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0));
        let g = PixelGrid::from_csg(window, res(), MaterialId(0), &Csg::Nothing);
        assert!(!g.any_solid());
    }
}
