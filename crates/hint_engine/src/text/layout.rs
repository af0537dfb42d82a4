//! Text layout engine
//!
//! Turns markup into measured lines of characters. Layout is a pure
//! function of `(text, base font size)`; [`MarkupParser`] memoizes it.
//!
//! # Layout Coordinate System
//!
//! - Widths and heights are in surface units
//! - Lines stack downwards; a line is as tall as its tallest character
//!   unless `<line-height>` overrides it
//! - A line never grows wider than [`MAX_LINE_WIDTH`] unless a single
//!   character is wider on its own

use std::fmt::Write as _;
use std::sync::Arc;

use super::font_metrics::{FontMetrics, FontStyle};
use super::markup::{match_tag, CaseStyle, TagKind, TextAlign};
use crate::cache::{CacheResult, LruCache};

/// Widest a line may get before the next character wraps (±1200 units)
pub const MAX_LINE_WIDTH: f32 = 2400.0;

/// Size factor applied to lowercase letters rendered in smallcaps
pub const SMALLCAPS_SCALE: f32 = 0.8;

/// Size factor applied inside `<sub>` / `<sup>`
pub const SCRIPT_SCALE: f32 = 0.5;

/// Vertical shift of `<sub>` / `<sup>`, as a fraction of the font size
pub const SCRIPT_SHIFT: f32 = 0.4;

/// A single measured glyph
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    /// Glyph after case transforms
    pub glyph: char,
    /// Size after size tags, case style and sub/superscript
    pub font_size: f32,
    /// Advance width
    pub width: f32,
    /// Line height contribution
    pub height: f32,
    /// Vertical offset from `<voffset>` and sub/superscript
    pub voffset: f32,
    /// Bold/italic flags in effect
    pub style: FontStyle,
}

/// One measured line of text
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Alignment in effect at the line's first character
    pub align: TextAlign,
    /// Explicit `<line-height>`, if declared on this line
    pub line_height: Option<f32>,
    /// Horizontal offset from `<pos>`
    pub pos: f32,
    /// Source markup of this line, tags included
    pub raw_text: String,
    /// Closing tags balancing whatever `raw_text` leaves open
    pub closing_tags: String,
    /// Measured glyphs in order
    pub characters: Vec<Character>,
}

impl Line {
    /// Explicit line height, else the tallest character
    pub fn height(&self) -> f32 {
        self.line_height.unwrap_or_else(|| {
            self.characters
                .iter()
                .map(|c| c.height)
                .fold(0.0, f32::max)
        })
    }

    /// Sum of character widths
    pub fn width(&self) -> f32 {
        self.characters.iter().map(|c| c.width).sum()
    }

    /// Whether the line renders no glyphs
    pub fn is_blank(&self) -> bool {
        self.characters.iter().all(|c| c.glyph.is_whitespace())
    }

    /// Raw text with its balancing closers appended
    pub fn balanced_text(&self) -> String {
        let mut text = String::with_capacity(self.raw_text.len() + self.closing_tags.len());
        text.push_str(&self.raw_text);
        text.push_str(&self.closing_tags);
        text
    }
}

/// Width and height of a block of lines
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBounds {
    /// Widest line
    pub width: f32,
    /// Sum of line heights
    pub height: f32,
}

impl TextBounds {
    /// Measure a block of lines
    pub fn of(lines: &[Line]) -> Self {
        Self {
            width: lines.iter().map(Line::width).fold(0.0, f32::max),
            height: lines.iter().map(Line::height).sum(),
        }
    }
}

/// Tag-driven state; stacks persist across lines, scalars reset per line
struct LayoutState {
    base_size: f32,
    sizes: Vec<f32>,
    aligns: Vec<TextAlign>,
    cases: Vec<CaseStyle>,
    scripts: Vec<f32>,
    bold: usize,
    italic: usize,
    noparse: bool,

    // per line
    pos: f32,
    voffset: f32,
    line_height: Option<f32>,
}

impl LayoutState {
    fn new(base_size: f32) -> Self {
        Self {
            base_size,
            sizes: Vec::new(),
            aligns: Vec::new(),
            cases: Vec::new(),
            scripts: Vec::new(),
            bold: 0,
            italic: 0,
            noparse: false,
            pos: 0.0,
            voffset: 0.0,
            line_height: None,
        }
    }

    fn size(&self) -> f32 {
        self.sizes.last().copied().unwrap_or(self.base_size)
    }

    fn align(&self) -> TextAlign {
        self.aligns.last().copied().unwrap_or_default()
    }

    fn case(&self) -> CaseStyle {
        self.cases.last().copied().unwrap_or(CaseStyle::SmallCaps)
    }

    fn style(&self) -> FontStyle {
        let mut style = FontStyle::empty();
        style.set(FontStyle::BOLD, self.bold > 0);
        style.set(FontStyle::ITALIC, self.italic > 0);
        style
    }

    fn reset_line(&mut self) {
        self.pos = 0.0;
        self.voffset = 0.0;
        self.line_height = None;
    }

    fn apply(&mut self, kind: TagKind) {
        match kind {
            TagKind::Align(align) => self.aligns.push(align),
            TagKind::AlignClose => {
                self.aligns.pop();
            }
            TagKind::Size(value) => self.sizes.push(value.resolve(self.base_size)),
            TagKind::SizeClose => {
                self.sizes.pop();
            }
            TagKind::LineHeight(length) => self.line_height = Some(length.resolve(self.base_size)),
            TagKind::LineHeightClose => self.line_height = None,
            TagKind::Pos(length) => self.pos = length.resolve(self.base_size),
            TagKind::VOffset(length) => self.voffset = length.resolve(self.base_size),
            TagKind::VOffsetClose => self.voffset = 0.0,
            TagKind::Bold(true) => self.bold += 1,
            TagKind::Bold(false) => self.bold = self.bold.saturating_sub(1),
            TagKind::Italic(true) => self.italic += 1,
            TagKind::Italic(false) => self.italic = self.italic.saturating_sub(1),
            TagKind::Case(style) => self.cases.push(style),
            TagKind::CaseClose(_) => {
                self.cases.pop();
            }
            TagKind::Sub(true) => self.scripts.push(-SCRIPT_SHIFT),
            TagKind::Sup(true) => self.scripts.push(SCRIPT_SHIFT),
            TagKind::Sub(false) | TagKind::Sup(false) => {
                self.scripts.pop();
            }
            TagKind::NoParse => self.noparse = true,
            TagKind::NoParseClose => self.noparse = false,
            TagKind::LineBreak | TagKind::Passthrough => {}
        }
    }

    /// Tags that re-open the active styles on a fresh line
    fn reopen_tags(&self) -> String {
        let mut tags = String::new();
        if let Some(size) = self.sizes.last() {
            let _ = write!(tags, "<size={}>", format_number(*size));
        }
        if self.bold > 0 {
            tags.push_str("<b>");
        }
        if self.italic > 0 {
            tags.push_str("<i>");
        }
        if let Some(case) = self.cases.last() {
            let _ = write!(tags, "<{}>", case.tag_name());
        }
        for script in self.script_tags() {
            let _ = write!(tags, "<{}>", script);
        }
        tags
    }

    /// Open `<sub>`/`<sup>` tags, outermost first
    fn script_tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.scripts
            .iter()
            .map(|shift| if *shift < 0.0 { "sub" } else { "sup" })
    }
}

/// Tracks which tags a single line's raw text opened without closing
#[derive(Default)]
struct OpenTags {
    sizes: usize,
    bold: usize,
    italic: usize,
    cases: Vec<CaseStyle>,
    scripts: Vec<&'static str>,
}

impl OpenTags {
    fn from_reopened(state: &LayoutState) -> Self {
        Self {
            sizes: usize::from(!state.sizes.is_empty()),
            bold: usize::from(state.bold > 0),
            italic: usize::from(state.italic > 0),
            cases: state.cases.last().copied().into_iter().collect(),
            scripts: state.script_tags().collect(),
        }
    }

    fn track(&mut self, kind: TagKind) {
        match kind {
            TagKind::Size(_) => self.sizes += 1,
            TagKind::SizeClose => self.sizes = self.sizes.saturating_sub(1),
            TagKind::Bold(true) => self.bold += 1,
            TagKind::Bold(false) => self.bold = self.bold.saturating_sub(1),
            TagKind::Italic(true) => self.italic += 1,
            TagKind::Italic(false) => self.italic = self.italic.saturating_sub(1),
            TagKind::Case(style) => self.cases.push(style),
            TagKind::CaseClose(_) => {
                self.cases.pop();
            }
            TagKind::Sub(true) => self.scripts.push("sub"),
            TagKind::Sup(true) => self.scripts.push("sup"),
            TagKind::Sub(false) | TagKind::Sup(false) => {
                self.scripts.pop();
            }
            _ => {}
        }
    }

    fn closers(&self, noparse: bool) -> String {
        let mut tags = String::new();
        if noparse {
            tags.push_str("</noparse>");
        }
        for script in self.scripts.iter().rev() {
            let _ = write!(tags, "</{}>", script);
        }
        for case in self.cases.iter().rev() {
            let _ = write!(tags, "</{}>", case.tag_name());
        }
        tags.push_str(&"</i>".repeat(self.italic));
        tags.push_str(&"</b>".repeat(self.bold));
        tags.push_str(&"</size>".repeat(self.sizes));
        tags
    }
}

/// Accumulates one line while scanning
struct LineBuilder {
    raw_text: String,
    characters: Vec<Character>,
    width: f32,
    align: Option<TextAlign>,
    open: OpenTags,
}

impl LineBuilder {
    fn start(state: &LayoutState, first: bool) -> Self {
        if first {
            return Self {
                raw_text: String::new(),
                characters: Vec::new(),
                width: 0.0,
                align: None,
                open: OpenTags::default(),
            };
        }
        let mut raw_text = String::new();
        if state.noparse {
            raw_text.push_str("<noparse>");
        }
        raw_text.push_str(&state.reopen_tags());
        Self {
            raw_text,
            characters: Vec::new(),
            width: 0.0,
            align: None,
            open: OpenTags::from_reopened(state),
        }
    }

    fn finish(self, state: &LayoutState) -> Line {
        Line {
            align: self.align.unwrap_or_else(|| state.align()),
            line_height: state.line_height,
            pos: state.pos,
            closing_tags: self.open.closers(state.noparse),
            raw_text: self.raw_text,
            characters: self.characters,
        }
    }
}

/// Lay out `text` at `base_size` into measured lines
///
/// Unknown or malformed tags are laid out as literal text. Empty input
/// yields one empty line.
pub fn parse(text: &str, base_size: f32, metrics: &FontMetrics) -> Vec<Line> {
    let mut state = LayoutState::new(base_size);
    let mut lines = Vec::new();
    let mut line = LineBuilder::start(&state, true);
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        let Some(ch) = rest.chars().next() else { break };

        if ch == '<' {
            if let Some(tag) = match_tag(rest) {
                let literal = state.noparse && tag.kind != TagKind::NoParseClose;
                if !literal {
                    state.apply(tag.kind);
                    if tag.kind == TagKind::LineBreak {
                        lines.push(line.finish(&state));
                        state.reset_line();
                        line = LineBuilder::start(&state, false);
                    } else {
                        line.open.track(tag.kind);
                        line.raw_text.push_str(&rest[..tag.len]);
                    }
                    index += tag.len;
                    continue;
                }
            }
        }

        match ch {
            '\n' => {
                lines.push(line.finish(&state));
                state.reset_line();
                line = LineBuilder::start(&state, false);
            }
            '\r' => {}
            _ => {
                let measured = measure_char(ch, &state, metrics);
                let added: f32 = measured.iter().map(|c| c.width).sum();

                if !line.characters.is_empty() && line.width + added > MAX_LINE_WIDTH {
                    // Defer the character to a fresh line; `pos`, `voffset`
                    // and `line-height` stay with the line that declared them.
                    lines.push(line.finish(&state));
                    state.reset_line();
                    line = LineBuilder::start(&state, false);
                }

                if line.align.is_none() {
                    line.align = Some(state.align());
                }
                line.width += added;
                line.characters.extend(measured);
                line.raw_text.push(ch);
            }
        }
        index += ch.len_utf8();
    }

    lines.push(line.finish(&state));
    lines
}

/// Measure one source character, applying case transforms
fn measure_char(ch: char, state: &LayoutState, metrics: &FontMetrics) -> Vec<Character> {
    let tag_size = state.size();
    let script_shift: f32 = state.scripts.iter().sum::<f32>() * tag_size;
    let script_scale = SCRIPT_SCALE.powi(state.scripts.len() as i32);
    let style = state.style();

    let (glyphs, case_scale): (Vec<char>, f32) = match state.case() {
        CaseStyle::Lowercase => (ch.to_lowercase().collect(), 1.0),
        CaseStyle::Uppercase | CaseStyle::AllCaps => (ch.to_uppercase().collect(), 1.0),
        CaseStyle::SmallCaps if ch.is_lowercase() => (ch.to_uppercase().collect(), SMALLCAPS_SCALE),
        CaseStyle::SmallCaps => (vec![ch], 1.0),
    };

    let font_size = tag_size * case_scale * script_scale;
    let height = metrics.line_height(tag_size);

    glyphs
        .into_iter()
        .map(|glyph| Character {
            glyph,
            font_size,
            width: metrics.char_width(glyph, font_size, style),
            height,
            voffset: state.voffset + script_shift,
            style,
        })
        .collect()
}

/// Format a number the way the surface dialect expects: ASCII decimal,
/// at most one fractional digit
pub fn format_number(value: f32) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Memoizing front end of [`parse`]
///
/// Cached by exact `(text, base size)`; layouts are shared as `Arc<[Line]>`.
pub struct MarkupParser {
    metrics: Arc<FontMetrics>,
    cache: LruCache<(String, i32), Arc<[Line]>>,
}

impl MarkupParser {
    /// Create a parser with a layout cache of `capacity` entries
    pub fn new(metrics: Arc<FontMetrics>, capacity: usize) -> CacheResult<Self> {
        Ok(Self {
            metrics,
            cache: LruCache::new(capacity)?,
        })
    }

    /// Create a parser over the bundled metrics
    pub fn with_bundled_metrics(capacity: usize) -> CacheResult<Self> {
        Self::new(FontMetrics::bundled(), capacity)
    }

    /// Lay out `text` at `font_size`, reusing a cached layout when possible
    pub fn parse(&self, text: &str, font_size: i32) -> Arc<[Line]> {
        let key = (text.to_string(), font_size);
        if let Some(lines) = self.cache.try_get(&key) {
            return lines;
        }

        let lines: Arc<[Line]> = parse(text, font_size as f32, &self.metrics).into();
        self.cache.add(key, Arc::clone(&lines));
        lines
    }

    /// Measure `text` at `font_size`
    pub fn measure(&self, text: &str, font_size: i32) -> TextBounds {
        TextBounds::of(&self.parse(text, font_size))
    }

    /// Metrics used for measurement
    pub fn metrics(&self) -> &Arc<FontMetrics> {
        &self.metrics
    }

    /// Number of cached layouts
    pub fn cached_layouts(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for MarkupParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupParser")
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout(text: &str) -> Vec<Line> {
        parse(text, 20.0, &FontMetrics::bundled())
    }

    #[test]
    fn test_plain_text_is_one_line() {
        let text = "Plain text, no tags at all!";
        let lines = layout(text);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].raw_text, text);
        assert_eq!(lines[0].characters.len(), text.chars().count());
        assert_eq!(lines[0].closing_tags, "");
    }

    #[test]
    fn test_empty_input() {
        let lines = layout("");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].characters.is_empty());
        assert_eq!(lines[0].height(), 0.0);
        assert_eq!(lines[0].width(), 0.0);
    }

    #[test]
    fn test_tag_only_line_keeps_explicit_height() {
        let lines = layout("<line-height=50><b></b>");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].characters.is_empty());
        assert_eq!(lines[0].width(), 0.0);
        assert_eq!(lines[0].height(), 50.0);
    }

    #[test]
    fn test_newlines_split_and_reset_scalars() {
        let lines = layout("<pos=100><voffset=5>a\nb");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].pos, 100.0);
        assert_eq!(lines[0].characters[0].voffset, 5.0);
        assert_eq!(lines[1].pos, 0.0);
        assert_eq!(lines[1].characters[0].voffset, 0.0);
        assert_eq!(lines[1].raw_text, "b");
    }

    #[test]
    fn test_br_tag_breaks_line() {
        let lines = layout("top<br>bottom");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].raw_text, "top");
        assert_eq!(lines[1].raw_text, "bottom");
    }

    #[test]
    fn test_size_stack() {
        let lines = layout("<size=40>A<size=10>B</size>C</size>D");
        let sizes: Vec<f32> = lines[0].characters.iter().map(|c| c.font_size).collect();
        assert_eq!(sizes, vec![40.0, 10.0, 40.0, 20.0]);
        assert_relative_eq!(lines[0].height(), 48.0);
    }

    #[test]
    fn test_default_smallcaps() {
        let lines = layout("aA");
        let chars = &lines[0].characters;
        assert_eq!(chars[0].glyph, 'A');
        assert_relative_eq!(chars[0].font_size, 16.0);
        assert_eq!(chars[1].glyph, 'A');
        assert_relative_eq!(chars[1].font_size, 20.0);
        assert_relative_eq!(chars[0].height, chars[1].height);
    }

    #[test]
    fn test_explicit_case_tags() {
        let lines = layout("<lowercase>AB</lowercase><uppercase>cd</uppercase>");
        let glyphs: String = lines[0].characters.iter().map(|c| c.glyph).collect();
        assert_eq!(glyphs, "abCD");
        assert!(lines[0].characters.iter().all(|c| c.font_size == 20.0));
    }

    #[test]
    fn test_bold_widens_line() {
        let plain = layout("<uppercase>hello</uppercase>");
        let bold = layout("<uppercase><b>hello</b></uppercase>");
        assert!(bold[0].width() > plain[0].width());
    }

    #[test]
    fn test_malformed_tags_are_literal() {
        let lines = layout("<size=big>x");
        assert_eq!(lines[0].characters.len(), "<size=big>x".len());
        assert_eq!(lines[0].characters[0].glyph, '<');
    }

    #[test]
    fn test_noparse_makes_tags_literal() {
        let lines = layout("<noparse><b></noparse>");
        let glyphs: String = lines[0].characters.iter().map(|c| c.glyph).collect();
        assert_eq!(glyphs, "<B>");
        assert!(lines[0].characters.iter().all(|c| c.style.is_empty()));
    }

    #[test]
    fn test_overflow_wraps_within_bound() {
        let text = "W".repeat(300);
        let lines = layout(&text);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width() <= MAX_LINE_WIDTH);
        }
        let total: usize = lines.iter().map(|l| l.characters.len()).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_overflow_reopens_styles() {
        let text = format!("<size=40><b>{}</b></size>", "m".repeat(200));
        let lines = layout(&text);
        assert!(lines.len() > 1);
        assert_eq!(lines[0].closing_tags, "</b></size>");
        assert!(lines[1].raw_text.starts_with("<size=40><b>"));
        assert!(lines[1].characters.iter().all(|c| c.style.contains(FontStyle::BOLD)));
        let last = lines.last().unwrap();
        assert_eq!(last.closing_tags, "");
    }

    #[test]
    fn test_sub_and_sup() {
        let lines = layout("x<sup>2</sup><sub>i</sub>");
        let chars = &lines[0].characters;
        assert_relative_eq!(chars[1].font_size, 10.0);
        assert_relative_eq!(chars[1].voffset, 8.0);
        assert_relative_eq!(chars[2].voffset, -8.0);
    }

    #[test]
    fn test_wrapped_script_is_reopened() {
        let text = format!("<sup>{}</sup>", "m".repeat(400));
        let lines = layout(&text);
        assert!(lines.len() > 1);
        assert_eq!(lines[0].closing_tags, "</sup>");
        assert!(lines[1].raw_text.starts_with("<sup>m"));
        assert_relative_eq!(lines[1].characters[0].voffset, 8.0);

        let last = lines.last().unwrap();
        assert!(last.raw_text.ends_with("</sup>"));
        assert_eq!(last.closing_tags, "");

        // every emitted line lays out again to the width it was measured at
        for line in &lines {
            let again = layout(&line.balanced_text());
            assert_eq!(again.len(), 1);
            assert_relative_eq!(again[0].width(), line.width(), epsilon = 0.01);
        }
    }

    #[test]
    fn test_nested_scripts_reopen_in_order() {
        let text = format!("<sub><sup>{}</sup></sub>", "m".repeat(1500));
        let lines = layout(&text);
        assert!(lines.len() > 1);
        assert_eq!(lines[0].closing_tags, "</sup></sub>");
        assert!(lines[1].raw_text.starts_with("<sub><sup>"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(12.34), "12.3");
        assert_eq!(format_number(-0.04), "0");
        assert_eq!(format_number(-7.5), "-7.5");
    }

    #[test]
    fn test_parser_cache_reuses_layout() {
        let parser = MarkupParser::with_bundled_metrics(4).unwrap();
        let first = parser.parse("cached", 20);
        let second = parser.parse("cached", 20);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(parser.cached_layouts(), 1);

        let other_size = parser.parse("cached", 30);
        assert!(!Arc::ptr_eq(&first, &other_size));
        assert_eq!(parser.cached_layouts(), 2);
    }
}
