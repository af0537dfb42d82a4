//! Font metrics table
//!
//! Glyph advance widths for the hint font, loaded once from a RON table
//! bundled with the crate and shared immutably afterwards.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use serde::Deserialize;

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;

/// Errors that can occur while loading metrics
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// The metrics description could not be parsed
    #[error("Failed to parse font metrics: {0}")]
    Parse(String),

    /// The metrics description contains unusable values
    #[error("Invalid font metrics: {0}")]
    Invalid(String),
}

bitflags! {
    /// Glyph style flags that change advance widths
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        /// `<b>` is open
        const BOLD = 0b01;
        /// `<i>` is open
        const ITALIC = 0b10;
    }
}

const BUNDLED_METRICS: &str = include_str!("../../assets/font_metrics.ron");

/// On-disk layout of the metrics description
#[derive(Debug, Deserialize)]
struct MetricsDescription {
    reference_size: f32,
    default_width: f32,
    line_spacing: f32,
    regular: HashMap<char, f32>,
    #[serde(default)]
    bold: HashMap<char, f32>,
}

/// Immutable advance-width lookup
///
/// Widths scale linearly with font size. Italic glyphs use the regular
/// advances; bold glyphs use the bold table and fall back to the regular
/// one.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    reference_size: f32,
    default_width: f32,
    line_spacing: f32,
    regular: HashMap<char, f32>,
    bold: HashMap<char, f32>,
}

impl FontMetrics {
    /// Parse a metrics description in RON format
    pub fn from_ron(source: &str) -> FontResult<Self> {
        let description: MetricsDescription =
            ron::from_str(source).map_err(|e| FontError::Parse(e.to_string()))?;

        if !(description.reference_size > 0.0) {
            return Err(FontError::Invalid("reference size must be positive".to_string()));
        }
        if !(description.line_spacing > 0.0) {
            return Err(FontError::Invalid("line spacing must be positive".to_string()));
        }

        Ok(Self {
            reference_size: description.reference_size,
            default_width: description.default_width.max(0.0),
            line_spacing: description.line_spacing,
            regular: description.regular,
            bold: description.bold,
        })
    }

    /// Metrics that know no glyphs; every character gets the default width
    pub fn fallback() -> Self {
        Self {
            reference_size: 100.0,
            default_width: 56.0,
            line_spacing: 1.2,
            regular: HashMap::new(),
            bold: HashMap::new(),
        }
    }

    /// The metrics bundled with the crate, parsed on first use
    pub fn bundled() -> Arc<FontMetrics> {
        static BUNDLED: OnceLock<Arc<FontMetrics>> = OnceLock::new();
        Arc::clone(BUNDLED.get_or_init(|| match Self::from_ron(BUNDLED_METRICS) {
            Ok(metrics) => {
                log::debug!("Loaded bundled font metrics ({} glyphs)", metrics.regular.len());
                Arc::new(metrics)
            }
            Err(e) => {
                log::error!("Bundled font metrics unusable, using fallback widths: {}", e);
                Arc::new(Self::fallback())
            }
        }))
    }

    /// Advance width of `ch` at `font_size`
    pub fn char_width(&self, ch: char, font_size: f32, style: FontStyle) -> f32 {
        let base = if style.contains(FontStyle::BOLD) {
            self.bold.get(&ch).or_else(|| self.regular.get(&ch))
        } else {
            self.regular.get(&ch)
        };

        base.copied().unwrap_or(self.default_width) * font_size / self.reference_size
    }

    /// Height of one line of text at `font_size`
    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }

    /// Whether the table has an explicit width for `ch`
    pub fn knows(&self, ch: char) -> bool {
        self.regular.contains_key(&ch)
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::fallback()
    }
}
