//! The pixel grid engine: a rectangular solid/air bitmap at machine
//! resolution, with boolean set algebra, rasterization from CSG
//! expressions, contour extraction, hatching, offsetting and flood fill.
//!
//! A grid owns a dense bit-vector sized to its backing rectangle. Pixel
//! coordinates are always relative to the rectangle's south-west corner.
//! The distinguished [`PixelGrid::nothing`] value is an explicit empty grid,
//! the identity/absorbing element of the boolean algebra, never a null.

mod contour;
mod flood;
mod hatch;
mod offset;
mod raster;

pub use hatch::{HatchParams, SnakeJoinParams};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::material::MaterialId;
use crate::point::{Point2, Point2i};
use crate::rect::Rect;

/// Machine resolution, threaded through constructors instead of living in a
/// process-wide static so independent builds can coexist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridResolution {
    pixels_per_mm: f64,
}

impl GridResolution {
    pub fn new(pixels_per_mm: f64) -> Self {
        Self { pixels_per_mm }
    }

    /// Edge length of one pixel in millimetres.
    pub fn pixel_size(&self) -> f64 {
        1.0 / self.pixels_per_mm
    }

    pub fn pixels_per_mm(&self) -> f64 {
        self.pixels_per_mm
    }

    /// Number of whole pixels covering `mm` (at least 1 for positive input).
    pub fn span_pixels(&self, mm: f64) -> i32 {
        (mm * self.pixels_per_mm).ceil().max(0.0) as i32
    }
}

/// A rectangular bitmap of solid (1) / air (0) pixels.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    rect: Rect,
    res: GridResolution,
    width: i32,
    height: i32,
    bits: Vec<u64>,
    attribute: MaterialId,
}

impl PixelGrid {
    /// A grid covering `rect`, filled uniformly.
    pub fn filled(rect: Rect, res: GridResolution, attribute: MaterialId, solid: bool) -> Self {
        if rect.is_empty() {
            return Self::nothing(res, attribute);
        }
        let width = res.span_pixels(rect.width()).max(1);
        let height = res.span_pixels(rect.height()).max(1);
        let words = Self::word_count(width, height);
        let fill = if solid { !0u64 } else { 0u64 };
        let mut grid = Self {
            rect,
            res,
            width,
            height,
            bits: vec![fill; words],
            attribute,
        };
        if solid {
            grid.clear_slack();
        }
        grid
    }

    /// The distinguished empty grid: zero-sized, solid nowhere.
    pub fn nothing(res: GridResolution, attribute: MaterialId) -> Self {
        Self {
            rect: Rect::empty(),
            res,
            width: 0,
            height: 0,
            bits: Vec::new(),
            attribute,
        }
    }

    fn word_count(width: i32, height: i32) -> usize {
        ((width as usize) * (height as usize)).div_ceil(64)
    }

    /// True for the `nothing` sentinel (and any grid with no pixels).
    pub fn is_nothing(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn resolution(&self) -> GridResolution {
        self.res
    }

    pub fn attribute(&self) -> MaterialId {
        self.attribute
    }

    pub fn set_attribute(&mut self, attribute: MaterialId) {
        self.attribute = attribute;
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Pixel value; everything outside the backing rectangle is air.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let i = self.index(x, y);
        self.bits[i >> 6] & (1u64 << (i & 63)) != 0
    }

    /// Write one pixel. Writing outside the backing rectangle is a contract
    /// violation: hard failure in debug builds, warn-and-skip in release.
    pub fn set(&mut self, x: i32, y: i32, solid: bool) {
        if !self.in_bounds(x, y) {
            debug_assert!(
                false,
                "grid write outside backing rectangle: ({x}, {y}) in {}x{}",
                self.width, self.height
            );
            warn!(x, y, rect = %self.rect, "grid write outside backing rectangle, skipped");
            return;
        }
        let i = self.index(x, y);
        if solid {
            self.bits[i >> 6] |= 1u64 << (i & 63);
        } else {
            self.bits[i >> 6] &= !(1u64 << (i & 63));
        }
    }

    /// Fill the run `x0..=x1` of row `y` in one pass.
    pub fn fill_run(&mut self, y: i32, x0: i32, x1: i32, solid: bool) {
        let (lo, hi) = (x0.max(0), x1.min(self.width - 1));
        for x in lo..=hi {
            // Runs are short relative to word ops only near boundaries;
            // profiling never showed this loop, so it stays simple.
            let i = self.index(x, y);
            if solid {
                self.bits[i >> 6] |= 1u64 << (i & 63);
            } else {
                self.bits[i >> 6] &= !(1u64 << (i & 63));
            }
        }
    }

    /// Bits past `width*height` in the last word must stay zero so word
    /// comparisons and population counts are exact.
    fn clear_slack(&mut self) {
        let used = (self.width as usize) * (self.height as usize);
        if used % 64 != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= (1u64 << (used % 64)) - 1;
            }
        }
    }

    /// Real-world coordinates of a pixel's centre.
    pub fn pixel_centre(&self, x: i32, y: i32) -> Point2 {
        let s = self.res.pixel_size();
        self.rect.sw() + Point2::new((x as f64 + 0.5) * s, (y as f64 + 0.5) * s)
    }

    /// Real-world coordinates of a pixel's south-west corner.
    pub fn pixel_corner(&self, x: i32, y: i32) -> Point2 {
        let s = self.res.pixel_size();
        self.rect.sw() + Point2::new(x as f64 * s, y as f64 * s)
    }

    /// Pixel containing a real-world point (may be out of bounds).
    pub fn pixel_of(&self, p: &Point2) -> Point2i {
        let s = self.res.pixel_size();
        let d = *p - self.rect.sw();
        Point2i::new((d.x / s).floor() as i32, (d.y / s).floor() as i32)
    }

    /// Sample the grid at a real-world point.
    pub fn value(&self, p: &Point2) -> bool {
        let q = self.pixel_of(p);
        self.get(q.x, q.y)
    }

    /// Number of solid pixels.
    pub fn count_solid(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn any_solid(&self) -> bool {
        self.bits.iter().any(|w| *w != 0)
    }

    /// Pixel-space bounding box of the solid region, or `None` if air.
    pub fn solid_bounds(&self) -> Option<(Point2i, Point2i)> {
        let mut lo = Point2i::new(i32::MAX, i32::MAX);
        let mut hi = Point2i::new(i32::MIN, i32::MIN);
        let mut any = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    any = true;
                    lo.x = lo.x.min(x);
                    lo.y = lo.y.min(y);
                    hi.x = hi.x.max(x);
                    hi.y = hi.y.max(y);
                }
            }
        }
        any.then_some((lo, hi))
    }

    /// Copy of this grid re-windowed onto `new_rect`. Pixels are sampled by
    /// real-world position, so operands on different lattices combine
    /// correctly at the cost of a per-pixel pass.
    pub fn windowed(&self, new_rect: Rect) -> PixelGrid {
        if new_rect.is_empty() || self.is_nothing() {
            return PixelGrid::nothing(self.res, self.attribute);
        }
        let mut out = PixelGrid::filled(new_rect, self.res, self.attribute, false);
        for y in 0..out.height {
            for x in 0..out.width {
                if self.value(&out.pixel_centre(x, y)) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    fn merged_attribute(a: &PixelGrid, b: &PixelGrid) -> MaterialId {
        if a.attribute != b.attribute {
            warn!(
                left = %a.attribute,
                right = %b.attribute,
                "boolean op across materials, keeping left attribute"
            );
        }
        a.attribute
    }

    fn same_window(a: &PixelGrid, b: &PixelGrid) -> bool {
        a.rect == b.rect && a.width == b.width && a.height == b.height
    }

    /// Set union. `nothing` is the identity.
    pub fn union(a: &PixelGrid, b: &PixelGrid) -> PixelGrid {
        if a.is_nothing() {
            return b.clone();
        }
        if b.is_nothing() {
            return a.clone();
        }
        let attribute = Self::merged_attribute(a, b);
        if Self::same_window(a, b) {
            let mut out = a.clone();
            for (w, bw) in out.bits.iter_mut().zip(&b.bits) {
                *w |= bw;
            }
            out.attribute = attribute;
            return out;
        }
        let rect = a.rect.union(&b.rect);
        let mut out = a.windowed(rect);
        let rb = b.windowed(rect);
        for (w, bw) in out.bits.iter_mut().zip(&rb.bits) {
            *w |= bw;
        }
        out.attribute = attribute;
        out
    }

    /// Set intersection. `nothing` is absorbing.
    pub fn intersection(a: &PixelGrid, b: &PixelGrid) -> PixelGrid {
        if a.is_nothing() || b.is_nothing() {
            return PixelGrid::nothing(a.res, a.attribute);
        }
        let attribute = Self::merged_attribute(a, b);
        let rect = a.rect.intersection(&b.rect);
        if rect.is_empty() {
            return PixelGrid::nothing(a.res, attribute);
        }
        if Self::same_window(a, b) {
            let mut out = a.clone();
            for (w, bw) in out.bits.iter_mut().zip(&b.bits) {
                *w &= bw;
            }
            out.attribute = attribute;
            return out;
        }
        let mut out = a.windowed(rect);
        let rb = b.windowed(rect);
        for (w, bw) in out.bits.iter_mut().zip(&rb.bits) {
            *w &= bw;
        }
        out.attribute = attribute;
        out
    }

    /// Set difference `a \ b` over `a`'s rectangle.
    pub fn difference(a: &PixelGrid, b: &PixelGrid) -> PixelGrid {
        if a.is_nothing() {
            return PixelGrid::nothing(a.res, a.attribute);
        }
        if b.is_nothing() {
            return a.clone();
        }
        let attribute = Self::merged_attribute(a, b);
        let mut out = a.clone();
        let rb = if Self::same_window(a, b) {
            b.clone()
        } else {
            b.windowed(a.rect)
        };
        for (w, bw) in out.bits.iter_mut().zip(&rb.bits) {
            *w &= !bw;
        }
        out.attribute = attribute;
        out
    }

    /// Complement within this grid's own backing rectangle.
    pub fn complement(&self) -> PixelGrid {
        if self.is_nothing() {
            return self.clone();
        }
        let mut out = self.clone();
        for w in out.bits.iter_mut() {
            *w = !*w;
        }
        out.clear_slack();
        out
    }

    /// Same solid set on a rectangle trimmed to the solid pixels (plus a
    /// one-pixel margin so contour extraction sees the air border).
    /// Returns `nothing` if no pixel is solid.
    pub fn trimmed(&self) -> PixelGrid {
        match self.solid_bounds() {
            None => PixelGrid::nothing(self.res, self.attribute),
            Some((lo, hi)) => {
                let s = self.res.pixel_size();
                let sw = self.pixel_corner(lo.x, lo.y) - Point2::new(s, s);
                let ne = self.pixel_corner(hi.x + 1, hi.y + 1) + Point2::new(s, s);
                self.windowed(Rect::new(sw, ne))
            }
        }
    }

    /// Does `self` equal `other` as a set of solid pixels, compared over the
    /// union of their rectangles?
    pub fn same_shape(&self, other: &PixelGrid) -> bool {
        if self.is_nothing() && other.is_nothing() {
            return true;
        }
        let rect = self.rect.union(&other.rect);
        let a = self.windowed(rect);
        let b = other.windowed(rect);
        a.bits == b.bits
    }
}
