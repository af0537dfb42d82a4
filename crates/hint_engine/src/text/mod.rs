//! Text markup parsing and layout
//!
//! Converts surface markup into measured lines so element sizes and
//! positions can be reasoned about before the payload is sent.

pub mod font_metrics;
pub mod markup;
pub mod layout;

pub use font_metrics::{FontMetrics, FontStyle, FontError, FontResult};
pub use markup::{match_tag, strip_layout_tags, CaseStyle, Length, SizeValue, Tag, TagKind, TextAlign};
pub use layout::{
    format_number, parse, Character, Line, MarkupParser, TextBounds, MAX_LINE_WIDTH,
};
