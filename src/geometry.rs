//! Geometry primitives and the per-cell geometry cache
//!
//! Cached dimensions use `Option<f32>`: `None` means "never computed or
//! invalidated", which keeps a legitimately zero-sized cell distinct from a
//! dirty one.

use serde::{Deserialize, Serialize};

/// A position in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A rectangle defined by position and size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x() && p.x <= self.right() && p.y >= self.y() && p.y <= self.bottom()
    }

    /// True if `small` lies entirely inside this rectangle.
    pub fn contains_rect(&self, small: &Rect) -> bool {
        self.x() <= small.x()
            && self.y() <= small.y()
            && self.right() >= small.right()
            && self.bottom() >= small.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x() < other.right()
            && other.x() < self.right()
            && self.y() < other.bottom()
            && other.y() < self.bottom()
    }
}

/// Cached per-cell dimensions.
///
/// `width`, `height` and `center` describe the cell alone; the remaining
/// fields aggregate over the chains the cell heads and are invalidated
/// separately whenever chain structure changes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CellSizes {
    /// Width of this cell only
    pub width: Option<f32>,
    /// Height of this cell only
    pub height: Option<f32>,
    /// Offset from the top edge to the baseline
    pub center: Option<f32>,
    /// Sum of widths over the whole logical list headed here
    pub full_width: Option<f32>,
    /// Sum of widths over the current visual line of the draw chain
    pub line_width: Option<f32>,
    /// Maximum center over the current visual line
    pub max_center: Option<f32>,
    /// Maximum drop (height below baseline) over the current visual line
    pub max_drop: Option<f32>,
}

impl CellSizes {
    /// Distance from baseline to the bottom edge, if both parts are known.
    pub fn drop(&self) -> Option<f32> {
        match (self.height, self.center) {
            (Some(h), Some(c)) => Some(h - c),
            _ => None,
        }
    }

    /// Invalidate the cell's own dimensions.
    pub fn reset_size(&mut self) {
        self.width = None;
        self.height = None;
        self.center = None;
    }

    /// Invalidate the chain aggregates (full width, line width, max
    /// center/drop). Called whenever the chain that contributes to them
    /// changes.
    pub fn reset_lists(&mut self) {
        self.full_width = None;
        self.line_width = None;
        self.max_center = None;
        self.max_drop = None;
    }
}

/// Configuration values recorded at the last recalculation. A cell's cached
/// geometry is valid only while the live configuration still matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecalcStamp {
    pub font_size: f32,
    pub zoom_factor: f32,
    pub client_width: f32,
    pub was_broken: bool,
}
