//! Element model, floating placement and payload composition

pub mod elements;
pub mod placement;
pub mod compose;

pub use elements::{
    Boundary, Content, ContentContext, ContentError, DynamicLayout, Element, ElementKey, ElementKind,
    ElementState, HorizontalAlign, Margin, OverflowStrategy, Priority, StaticLayout, SyncSpeed,
    VerticalAnchor,
};
pub use placement::{find_position, PlacementRequest};
pub use compose::{Composer, Composition, PlacementMemory};
