//! Math utilities and types
//!
//! Screen-space geometry for text placement. The surface uses a
//! y-down coordinate system: `y = 0` is the top edge and grows towards
//! the bottom, `x = 0` is the horizontal centre.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Axis-aligned rectangle in surface space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge
    pub left: f32,
    /// Right edge
    pub right: f32,
    /// Top edge (smaller y)
    pub top: f32,
    /// Bottom edge (larger y)
    pub bottom: f32,
}

impl Rect {
    /// Create a rectangle from its four edges
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self { left, right, top, bottom }
    }

    /// Rectangle horizontally centred on `x` whose bottom edge sits at `y`
    pub fn centered_bottom(x: f32, y: f32, width: f32, height: f32) -> Self {
        let half = width / 2.0;
        Self::new(x - half, x + half, y - height, y)
    }

    /// Width of the rectangle
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height of the rectangle
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Grow each edge outwards by the given amounts
    pub fn expand(&self, left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self::new(
            self.left - left,
            self.right + right,
            self.top - top,
            self.bottom + bottom,
        )
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 10.0, 0.0, 10.0);
        let b = Rect::new(10.0, 20.0, 0.0, 10.0);
        let c = Rect::new(0.0, 10.0, 10.0, 20.0);

        assert!(!a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = Rect::new(0.0, 10.0, 0.0, 10.0);
        let b = Rect::new(5.0, 15.0, 5.0, 15.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_centered_bottom() {
        let rect = Rect::centered_bottom(0.0, 100.0, 40.0, 20.0);
        assert_eq!(rect, Rect::new(-20.0, 20.0, 80.0, 100.0));
        assert_eq!(rect.width(), 40.0);
        assert_eq!(rect.height(), 20.0);
    }
}
