//! Contour extraction by marching squares.
//!
//! The tracer walks the lattice of pixel corners. Each 2x2 pixel
//! neighbourhood around a corner maps to an outgoing travel direction; the
//! two checkerboard patterns are saddles and are disambiguated by the
//! incoming direction, never by value, so touching-diagonal shapes do not
//! get split or merged by accident. Traversal state is a set of visited
//! directed steps, which guarantees every boundary is traced exactly once,
//! and the walk itself is a flat loop.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::polygon::{Polygon, PolygonList};

use super::PixelGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    fn step(&self) -> (i32, i32) {
        match self {
            Dir::Up => (0, 1),
            Dir::Down => (0, -1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

impl PixelGrid {
    /// 4-bit neighbourhood code of the corner node `(x, y)`:
    /// bit 1 = SW pixel, 2 = SE, 4 = NE, 8 = NW. Out-of-rectangle pixels
    /// read as air, so shapes touching the rectangle edge still close.
    fn corner_code(&self, x: i32, y: i32) -> u8 {
        let mut code = 0u8;
        if self.get(x - 1, y - 1) {
            code |= 1;
        }
        if self.get(x, y - 1) {
            code |= 2;
        }
        if self.get(x, y) {
            code |= 4;
        }
        if self.get(x - 1, y) {
            code |= 8;
        }
        code
    }

    /// Outgoing direction for a boundary node, given how we arrived.
    /// `None` for the non-boundary codes 0 and 15.
    fn outgoing(code: u8, incoming: Dir) -> Option<Dir> {
        Some(match code {
            1 | 3 | 7 => Dir::Left,
            2 | 6 | 14 => Dir::Down,
            4 | 12 | 13 => Dir::Right,
            8 | 9 | 11 => Dir::Up,
            // Saddles: keep turning around the solid we were following.
            5 => match incoming {
                Dir::Up => Dir::Left,
                Dir::Down => Dir::Right,
                other => {
                    warn!(?other, "inconsistent approach to saddle 5");
                    return None;
                }
            },
            10 => match incoming {
                Dir::Right => Dir::Up,
                Dir::Left => Dir::Down,
                other => {
                    warn!(?other, "inconsistent approach to saddle 10");
                    return None;
                }
            },
            _ => return None,
        })
    }

    /// First outgoing directions worth trying from a starting node.
    fn start_directions(code: u8) -> &'static [Dir] {
        match code {
            1 | 3 | 7 => &[Dir::Left],
            2 | 6 | 14 => &[Dir::Down],
            4 | 12 | 13 => &[Dir::Right],
            8 | 9 | 11 => &[Dir::Up],
            5 => &[Dir::Left, Dir::Right],
            10 => &[Dir::Up, Dir::Down],
            _ => &[],
        }
    }

    /// All boundary loops as closed polygons in real-world coordinates,
    /// simplified with the given perpendicular-deviation tolerance (about
    /// 0.8 of a pixel merges 45-degree staircases without rounding square
    /// corners). Solid regions come out counter-clockwise, holes clockwise.
    pub fn contours(&self, tolerance: f64) -> PolygonList {
        let mut out = PolygonList::new();
        if self.is_nothing() {
            return out;
        }
        let mut visited: HashSet<(i32, i32, Dir)> = HashSet::new();
        // The cap is a safety net: no trace can exceed the number of
        // directed lattice steps.
        let cap = 4 * ((self.width as usize) + 2) * ((self.height as usize) + 2);

        for y in 0..=self.height {
            for x in 0..=self.width {
                let code = self.corner_code(x, y);
                for &dir in Self::start_directions(code) {
                    if visited.contains(&(x, y, dir)) {
                        continue;
                    }
                    if let Some(poly) = self.trace_loop(x, y, dir, &mut visited, cap) {
                        let simplified = poly.simplify(tolerance);
                        if simplified.len() >= 3 {
                            out.push(simplified);
                        }
                    }
                }
            }
        }
        debug!(loops = out.len(), "extracted contours");
        out
    }

    fn trace_loop(
        &self,
        sx: i32,
        sy: i32,
        sdir: Dir,
        visited: &mut HashSet<(i32, i32, Dir)>,
        cap: usize,
    ) -> Option<Polygon> {
        let mut poly = Polygon::closed(self.attribute());
        let (mut x, mut y, mut dir) = (sx, sy, sdir);
        let mut steps = 0usize;
        loop {
            if steps > cap {
                warn!(sx, sy, "contour trace exceeded step cap, dropping loop");
                return None;
            }
            steps += 1;
            visited.insert((x, y, dir));
            poly.push(self.pixel_corner(x, y));
            let (dx, dy) = dir.step();
            x += dx;
            y += dy;
            if x == sx && y == sy {
                return Some(poly);
            }
            let code = self.corner_code(x, y);
            match Self::outgoing(code, dir) {
                Some(next) => dir = next,
                None => {
                    // Dead end means the neighbourhood changed under us or
                    // the code table was entered off-boundary; degrade by
                    // dropping the loop rather than aborting the layer.
                    warn!(x, y, code, "contour trace dead-ended");
                    return None;
                }
            }
        }
    }
}
