//! Composition of all visible elements into one payload
//!
//! Elements are measured, floating ones are placed around the static ones,
//! and everything is emitted as self-contained per-line fragments ordered
//! top to bottom. Two invisible markers at extreme vertical offsets wrap
//! the payload so the renderer's automatic centring stays put no matter
//! how tall the real content is.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::elements::{Element, ElementKey, ElementKind, HorizontalAlign, StaticLayout, VerticalAnchor};
use super::placement::{find_position, PlacementRequest};
use crate::core::{PlacementConfig, SurfaceConfig};
use crate::foundation::math::{Point2, Rect};
use crate::text::{format_number, strip_layout_tags, Line, MarkupParser, TextBounds};

/// Positions chosen for floating elements, carried between passes
pub type PlacementMemory = HashMap<ElementKey, Point2>;

/// Result of one composition pass
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Markup delivered to the renderer
    pub payload: String,
    /// Floating element positions to reuse next pass
    pub placements: PlacementMemory,
    /// Number of elements that made it into the payload
    pub rendered: usize,
}

/// An element resolved to a fixed, measured, visible block
struct Positioned {
    key: ElementKey,
    layout: StaticLayout,
    font_size: i32,
    lines: Arc<[Line]>,
    bounds: TextBounds,
}

impl Positioned {
    fn bottom(&self) -> f32 {
        self.layout.bottom(self.bounds.height)
    }

    fn bounds(&self) -> Rect {
        self.layout.bounds(self.bounds.width, self.bounds.height)
    }
}

/// Builds payloads against one surface
pub struct Composer<'a> {
    parser: &'a MarkupParser,
    surface: &'a SurfaceConfig,
    placement: &'a PlacementConfig,
}

impl<'a> Composer<'a> {
    /// `placement` supplies the search step and the defaults for floating
    /// elements that do not set their own boundary or margin
    pub fn new(parser: &'a MarkupParser, surface: &'a SurfaceConfig, placement: &'a PlacementConfig) -> Self {
        Self { parser, surface, placement }
    }

    /// Compose `elements` for `viewer`
    ///
    /// `previous` holds floating positions from the last pass; the returned
    /// composition carries the positions chosen this time.
    pub fn compose(&self, elements: &[Arc<Element>], viewer: &str, previous: &PlacementMemory) -> Composition {
        let mut statics = Vec::new();
        let mut dynamics = Vec::new();

        for element in elements {
            let state = element.snapshot();
            if state.hidden {
                continue;
            }

            let text = strip_layout_tags(&element.resolve_text(viewer));
            if text.is_empty() {
                continue;
            }

            let font_size = if state.font_size > 0 { state.font_size } else { self.surface.default_font_size };
            let lines = self.parser.parse(&text, font_size);
            let bounds = TextBounds::of(&lines);

            match state.kind {
                ElementKind::Static(mut layout) => {
                    layout.x = self.surface.clamp_x(layout.x);
                    layout.y = self.surface.clamp_y(layout.y);
                    statics.push(Positioned { key: element.key(), layout, font_size, lines, bounds });
                }
                ElementKind::Dynamic(layout) => {
                    dynamics.push((layout, Positioned {
                        key: element.key(),
                        layout: StaticLayout::default(),
                        font_size,
                        lines,
                        bounds,
                    }));
                }
            }
        }

        let mut obstacles: Vec<Rect> = statics.iter().map(Positioned::bounds).collect();
        let mut placements = PlacementMemory::new();
        let mut placed = statics;

        dynamics.sort_by(|(a, x), (b, y)| b.priority.cmp(&a.priority).then(x.key.cmp(&y.key)));
        for (layout, mut item) in dynamics {
            let request = PlacementRequest {
                target: layout.target(),
                width: item.bounds.width,
                height: item.bounds.height,
                boundary: layout.boundary_or(self.placement.boundary),
                margin: layout.margin_or(self.placement.margin),
                overflow: layout.overflow,
                previous: previous.get(&item.key).copied(),
            };

            let Some(position) = find_position(&request, &obstacles, self.placement.step) else {
                log::debug!("No room for floating element {:?}, hiding it", item.key);
                continue;
            };

            item.layout = StaticLayout {
                x: position.x,
                y: position.y,
                align: HorizontalAlign::Center,
                anchor: VerticalAnchor::Bottom,
            };
            obstacles.push(item.bounds());
            placements.insert(item.key, position);
            placed.push(item);
        }

        placed.sort_by(|a, b| a.bottom().total_cmp(&b.bottom()).then(a.key.cmp(&b.key)));

        let mut fragments = Vec::with_capacity(placed.len() + 2);
        fragments.push(self.marker(self.surface.marker_offset));
        for item in &placed {
            self.emit(item, &mut fragments);
        }
        fragments.push(self.marker(-self.surface.marker_offset));

        Composition {
            payload: fragments.join("\n"),
            placements,
            rendered: placed.len(),
        }
    }

    /// One fragment per non-empty line, stacked down from the block's top
    fn emit(&self, item: &Positioned, fragments: &mut Vec<String>) {
        let mut cursor = item.bottom() - item.bounds.height;

        for line in item.lines.iter() {
            cursor += line.height();
            if line.characters.is_empty() {
                continue;
            }

            let mut fragment = String::new();
            let pos = format_number(item.layout.x);
            if pos != "0" {
                let _ = write!(fragment, "<pos={}>", pos);
            }

            let align = match item.layout.align {
                HorizontalAlign::Center => None,
                other => Some(other.as_str()),
            };
            if let Some(align) = align {
                let _ = write!(fragment, "<align={}>", align);
            }

            fragment.push_str("<line-height=0>");
            let voffset = format_number(self.surface.baseline - cursor);
            let has_voffset = voffset != "0";
            if has_voffset {
                let _ = write!(fragment, "<voffset={}>", voffset);
            }

            let _ = write!(fragment, "<size={}>{}</size>", item.font_size, line.balanced_text());

            if has_voffset {
                fragment.push_str("</voffset>");
            }
            if align.is_some() {
                fragment.push_str("</align>");
            }
            fragments.push(fragment);
        }
    }

    fn marker(&self, offset: f32) -> String {
        format!(
            "<line-height=0><voffset={}><alpha=#00>.</alpha></voffset>",
            format_number(offset)
        )
    }
}
