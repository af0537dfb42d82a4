//! Floating element layout
//!
//! A floating element only names where it would like to be. Composition
//! searches for a free spot near the target each pass; the layout itself
//! is never changed by that search.

use super::core::{Boundary, Margin, OverflowStrategy, Priority};
use crate::foundation::math::Point2;

/// Target and search constraints of a floating element
///
/// `boundary` and `margin` left at `None` take the configured placement
/// defaults when the element is composed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DynamicLayout {
    /// Preferred x
    pub target_x: f32,
    /// Preferred bottom edge
    pub target_y: f32,
    /// Region the chosen position must stay within
    pub boundary: Option<Boundary>,
    /// Collision padding
    pub margin: Option<Margin>,
    /// Placement order among floating elements
    pub priority: Priority,
    /// What to do when no free spot exists
    pub overflow: OverflowStrategy,
}

impl DynamicLayout {
    /// Layout aiming at `(target_x, target_y)` with default constraints
    pub fn new(target_x: f32, target_y: f32) -> Self {
        Self { target_x, target_y, ..Default::default() }
    }

    /// Restrict the search to `boundary`
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Pad the collision box by `margin`
    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Target as a point
    pub fn target(&self) -> Point2 {
        Point2::new(self.target_x, self.target_y)
    }

    /// Boundary in effect, given the configured default
    pub fn boundary_or(&self, default: Boundary) -> Boundary {
        self.boundary.unwrap_or(default)
    }

    /// Margin in effect, given the configured default
    pub fn margin_or(&self, default: Margin) -> Margin {
        self.margin.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_constraints_use_defaults() {
        let configured = Boundary { top: 100.0, bottom: 900.0, left: -500.0, right: 500.0 };
        let layout = DynamicLayout::new(10.0, 20.0);
        assert_eq!(layout.boundary_or(configured), configured);
        assert_eq!(layout.margin_or(Margin::default()), Margin::default());
        assert_eq!(layout.target(), Point2::new(10.0, 20.0));
    }

    #[test]
    fn test_explicit_constraints_win() {
        let own = Boundary { top: 0.0, bottom: 50.0, left: -5.0, right: 5.0 };
        let margin = Margin { top: 2.0, ..Margin::default() };
        let layout = DynamicLayout::new(0.0, 0.0).with_boundary(own).with_margin(margin);
        assert_eq!(layout.boundary_or(Boundary::default()), own);
        assert_eq!(layout.margin_or(Margin::default()), margin);
    }
}
