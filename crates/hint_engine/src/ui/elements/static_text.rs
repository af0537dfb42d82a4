//! Fixed-position element layout

use super::core::{HorizontalAlign, VerticalAnchor};
use crate::foundation::math::Rect;

/// Where a static element sits on the surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaticLayout {
    /// Horizontal reference point in surface units
    pub x: f32,
    /// Vertical reference point in surface units, growing downwards
    pub y: f32,
    /// Which side of the block `x` refers to
    pub align: HorizontalAlign,
    /// Which edge of the block `y` refers to
    pub anchor: VerticalAnchor,
}

impl StaticLayout {
    /// Left-aligned, top-anchored layout at `(x, y)`
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, ..Default::default() }
    }

    /// Y of the bottom edge for a block of `height`
    pub fn bottom(&self, height: f32) -> f32 {
        self.anchor.bottom_of(self.y, height)
    }

    /// Bounding box of a `width` x `height` block at this layout
    pub fn bounds(&self, width: f32, height: f32) -> Rect {
        let bottom = self.bottom(height);
        let top = bottom - height;
        let (left, right) = match self.align {
            HorizontalAlign::Left => (self.x, self.x + width),
            HorizontalAlign::Center => (self.x - width / 2.0, self.x + width / 2.0),
            HorizontalAlign::Right => (self.x - width, self.x),
        };
        Rect::new(left, right, top, bottom)
    }
}
