//! Axis-aligned rectangles
//!
//! All playfield geometry is AABBs in canvas space (y grows downward).

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict horizontal overlap (touching edges do not count)
    #[inline]
    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.left() < other.right() && self.right() > other.left()
    }

    /// Strict overlap on both axes
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_x(other) && self.top() < other.bottom() && self.bottom() > other.top()
    }

    /// Overlap test for spike hazards: the dangerous region sits *above*
    /// the anchor line, spanning `[y - height, y]`
    pub fn overlaps_spike_region(&self, spike: &Rect) -> bool {
        self.overlaps_x(spike) && self.bottom() > spike.y - spike.height && self.top() < spike.y
    }

    /// True when this rect lies entirely outside a `width x height` field
    pub fn outside_field(&self, width: f32, height: f32) -> bool {
        self.right() < 0.0 || self.left() > width || self.top() > height || self.bottom() < 0.0
    }

    /// Center `inner` inside this rect, returning its new top-left corner
    pub fn centered(&self, inner: Vec2) -> Vec2 {
        Vec2::new(
            self.x + (self.width - inner.x) / 2.0,
            self.y + (self.height - inner.y) / 2.0,
        )
    }
}
