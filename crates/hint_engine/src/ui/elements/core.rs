//! Core element primitives
//!
//! Shared types used by static and floating elements.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use crate::schedule::SyncSpeed;
pub use crate::text::TextAlign as HorizontalAlign;

/// Process-unique identity of an element
///
/// The string id of an element is caller-chosen and may repeat; the key
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementKey(pub u64);

impl ElementKey {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ElementKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which edge of the text block the element's Y coordinate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAnchor {
    /// Y is the top edge
    Top,
    /// Y is the vertical centre
    Middle,
    /// Y is the bottom edge
    #[default]
    Bottom,
}

impl VerticalAnchor {
    /// Bottom edge of a block of `height` anchored at `y`
    pub fn bottom_of(&self, y: f32, height: f32) -> f32 {
        match self {
            VerticalAnchor::Top => y + height,
            VerticalAnchor::Middle => y + height / 2.0,
            VerticalAnchor::Bottom => y,
        }
    }
}

/// Placement order of floating elements; higher goes first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Medium,
    High,
    Highest,
}

/// What a floating element does when no free position exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowStrategy {
    /// Leave the element out of this composition
    #[default]
    Hide,
    /// Draw at the target even if it overlaps
    StayInPosition,
}

/// Region a floating element's position must stay within
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Boundary {
    /// Smallest allowed y
    pub top: f32,
    /// Largest allowed y
    pub bottom: f32,
    /// Smallest allowed x
    pub left: f32,
    /// Largest allowed x
    pub right: f32,
}

impl Default for Boundary {
    fn default() -> Self {
        Self {
            top: 0.0,
            bottom: 1080.0,
            left: -1200.0,
            right: 1200.0,
        }
    }
}

impl Boundary {
    /// Whether a position lies inside, edges included
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Padding added around a floating element for collision tests
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    /// Padding above the box
    pub top: f32,
    /// Padding below the box
    pub bottom: f32,
    /// Padding left of the box
    pub left: f32,
    /// Padding right of the box
    pub right: f32,
}
