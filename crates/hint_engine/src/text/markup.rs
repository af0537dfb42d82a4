//! Markup tag recognition
//!
//! Recognises the whitelisted rich-text tags of the surface dialect. Anything
//! that does not match a complete, well-formed whitelisted tag is left for
//! the caller to treat as literal text.

/// Longest tag, brackets included, that is still considered a tag
const MAX_TAG_LEN: usize = 128;

/// Horizontal alignment of a line of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum TextAlign {
    /// Left-aligned text
    Left,
    /// Center-aligned text
    #[default]
    Center,
    /// Right-aligned text
    Right,
}

impl TextAlign {
    /// Tag value used by the surface dialect
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" | "justified" | "flush" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }
}

/// Letter case transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStyle {
    /// `<lowercase>`
    Lowercase,
    /// `<uppercase>`
    Uppercase,
    /// `<allcaps>`
    AllCaps,
    /// `<smallcaps>`; also the style in effect when no case tag is open
    SmallCaps,
}

impl CaseStyle {
    /// Tag name used by the surface dialect
    pub fn tag_name(self) -> &'static str {
        match self {
            CaseStyle::Lowercase => "lowercase",
            CaseStyle::Uppercase => "uppercase",
            CaseStyle::AllCaps => "allcaps",
            CaseStyle::SmallCaps => "smallcaps",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "lowercase" => Some(CaseStyle::Lowercase),
            "uppercase" => Some(CaseStyle::Uppercase),
            "allcaps" => Some(CaseStyle::AllCaps),
            "smallcaps" => Some(CaseStyle::SmallCaps),
            _ => None,
        }
    }
}

/// A length as written in a tag value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Plain number or `px`
    Units(f32),
    /// Multiple of the base font size
    Em(f32),
    /// Percentage of the base font size
    Percent(f32),
}

impl Length {
    /// Resolve against the base font size
    pub fn resolve(self, base_size: f32) -> f32 {
        match self {
            Length::Units(value) => value,
            Length::Em(value) => value * base_size,
            Length::Percent(value) => value / 100.0 * base_size,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (number, make): (&str, fn(f32) -> Length) = if let Some(n) = value.strip_suffix("px") {
            (n, Length::Units)
        } else if let Some(n) = value.strip_suffix("em") {
            (n, Length::Em)
        } else if let Some(n) = value.strip_suffix('%') {
            (n, Length::Percent)
        } else {
            (value, Length::Units)
        };

        let number: f32 = number.trim().parse().ok()?;
        number.is_finite().then(|| make(number))
    }
}

/// Value of a `<size>` tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeValue {
    /// Absolute or base-relative size
    Absolute(Length),
    /// `+N` / `-N`, added to the base font size
    Relative(f32),
}

impl SizeValue {
    /// Resolve against the base font size
    pub fn resolve(self, base_size: f32) -> f32 {
        match self {
            SizeValue::Absolute(length) => length.resolve(base_size),
            SizeValue::Relative(delta) => base_size + delta,
        }
        .max(0.0)
    }

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('+') || value.starts_with('-') {
            let delta = match Length::parse(value)? {
                Length::Units(delta) => delta,
                _ => return None,
            };
            return Some(SizeValue::Relative(delta));
        }
        Length::parse(value).map(SizeValue::Absolute)
    }
}

/// What a recognised tag does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagKind {
    /// `<align=..>`
    Align(TextAlign),
    /// `</align>`
    AlignClose,
    /// `<size=..>`
    Size(SizeValue),
    /// `</size>`
    SizeClose,
    /// `<line-height=..>`
    LineHeight(Length),
    /// `</line-height>`
    LineHeightClose,
    /// `<pos=..>`
    Pos(Length),
    /// `<voffset=..>`
    VOffset(Length),
    /// `</voffset>`
    VOffsetClose,
    /// `<b>` (true) or `</b>` (false)
    Bold(bool),
    /// `<i>` (true) or `</i>` (false)
    Italic(bool),
    /// Opening case tag
    Case(CaseStyle),
    /// Closing case tag
    CaseClose(CaseStyle),
    /// `<sub>` (true) or `</sub>` (false)
    Sub(bool),
    /// `<sup>` (true) or `</sup>` (false)
    Sup(bool),
    /// `<br>`
    LineBreak,
    /// `<noparse>`
    NoParse,
    /// `</noparse>`
    NoParseClose,
    /// Recognised tag without layout effect (colour and friends)
    Passthrough,
}

impl TagKind {
    /// Tags that position text and are therefore owned by composition
    pub fn is_layout(self) -> bool {
        matches!(
            self,
            TagKind::Align(_)
                | TagKind::AlignClose
                | TagKind::LineHeight(_)
                | TagKind::LineHeightClose
                | TagKind::Pos(_)
                | TagKind::VOffset(_)
                | TagKind::VOffsetClose
        )
    }
}

/// A tag matched at the start of some input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tag {
    /// Effect of the tag
    pub kind: TagKind,
    /// Bytes consumed, brackets included
    pub len: usize,
}

/// Names of tags that are recognised but change nothing about layout
const PASSTHROUGH_TAGS: &[&str] = &[
    "color", "alpha", "mark", "u", "s", "font", "link", "cspace", "mspace", "indent",
];

/// Try to match a whitelisted tag at the start of `input`
///
/// `input` must start with `<`. Returns `None` for unknown names,
/// unterminated tags and values that do not parse.
pub fn match_tag(input: &str) -> Option<Tag> {
    let rest = input.strip_prefix('<')?;
    let end = rest
        .char_indices()
        .take_while(|&(i, _)| i + 2 <= MAX_TAG_LEN)
        .find(|&(_, c)| c == '>' || c == '<')
        .filter(|&(_, c)| c == '>')
        .map(|(i, _)| i)?;

    let body = &rest[..end];
    let len = end + 2;

    let (closing, body) = match body.strip_prefix('/') {
        Some(stripped) => (true, stripped),
        None => (false, body),
    };

    let (name, value) = match body.find('=') {
        Some(eq) => (&body[..eq], Some(unquote(body[eq + 1..].trim()))),
        None => (body, None),
    };
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    let kind = if closing {
        closing_kind(&name)?
    } else {
        opening_kind(&name, value)?
    };

    Some(Tag { kind, len })
}

fn opening_kind(name: &str, value: Option<&str>) -> Option<TagKind> {
    let kind = match (name, value) {
        ("align", Some(v)) => TagKind::Align(TextAlign::parse(v)?),
        ("size", Some(v)) => TagKind::Size(SizeValue::parse(v)?),
        ("line-height", Some(v)) => TagKind::LineHeight(Length::parse(v)?),
        ("pos", Some(v)) => TagKind::Pos(Length::parse(v)?),
        ("voffset", Some(v)) => TagKind::VOffset(Length::parse(v)?),
        ("b", None) => TagKind::Bold(true),
        ("i", None) => TagKind::Italic(true),
        ("sub", None) => TagKind::Sub(true),
        ("sup", None) => TagKind::Sup(true),
        ("br", None) => TagKind::LineBreak,
        ("noparse", None) => TagKind::NoParse,
        (name, None) if CaseStyle::parse(name).is_some() => TagKind::Case(CaseStyle::parse(name)?),
        (name, _) if PASSTHROUGH_TAGS.contains(&name) => TagKind::Passthrough,
        _ => return None,
    };
    Some(kind)
}

fn closing_kind(name: &str) -> Option<TagKind> {
    let kind = match name {
        "align" => TagKind::AlignClose,
        "size" => TagKind::SizeClose,
        "line-height" => TagKind::LineHeightClose,
        "voffset" => TagKind::VOffsetClose,
        "b" => TagKind::Bold(false),
        "i" => TagKind::Italic(false),
        "sub" => TagKind::Sub(false),
        "sup" => TagKind::Sup(false),
        "noparse" => TagKind::NoParseClose,
        name => match CaseStyle::parse(name) {
            Some(style) => TagKind::CaseClose(style),
            None if PASSTHROUGH_TAGS.contains(&name) => TagKind::Passthrough,
            None => return None,
        },
    };
    Some(kind)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Remove every layout tag (`align`, `line-height`, `voffset`, `pos`) from `text`
///
/// Text inside `<noparse>` is copied untouched.
pub fn strip_layout_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut noparse = false;
    let mut index = 0;

    while let Some(offset) = text[index..].find('<') {
        let start = index + offset;
        out.push_str(&text[index..start]);

        match match_tag(&text[start..]) {
            Some(tag) if noparse && tag.kind != TagKind::NoParseClose => {
                out.push('<');
                index = start + 1;
            }
            Some(tag) => {
                match tag.kind {
                    TagKind::NoParse => noparse = true,
                    TagKind::NoParseClose => noparse = false,
                    _ => {}
                }
                if !tag.kind.is_layout() {
                    out.push_str(&text[start..start + tag.len]);
                }
                index = start + tag.len;
            }
            None => {
                out.push('<');
                index = start + 1;
            }
        }
    }

    out.push_str(&text[index..]);
    out
}
