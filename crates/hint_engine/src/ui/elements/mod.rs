//! Element model
//!
//! An element is either static (fixed position) or floating (target
//! position resolved by collision search at composition time).

pub mod core;
pub mod element;
pub mod static_text;
pub mod dynamic_text;

pub use self::core::{
    Boundary, ElementKey, HorizontalAlign, Margin, OverflowStrategy, Priority, SyncSpeed,
    VerticalAnchor,
};
pub use element::{
    Content, ContentCallback, ContentContext, ContentError, Element, ElementKind, ElementState,
    DEFAULT_FONT_SIZE,
};
pub use static_text::StaticLayout;
pub use dynamic_text::DynamicLayout;
