//! Compatibility shim for plain third-party text
//!
//! Callers that only know how to show "some text for a while" go through
//! [`CompatShim::show`]. The text is laid out once, split into one centred
//! static element per line under a synthetic owner, and removed again when
//! its duration runs out. Layouts of recently shown texts are memoized.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheResult, LruCache};
use crate::core::{CompatConfig, HintConfig, SurfaceConfig};
use crate::session::{Registry, Session, SessionResult};
use crate::text::{MarkupParser, TextBounds};
use crate::ui::{Element, ElementState, HorizontalAlign, SyncSpeed, VerticalAnchor};

/// One line of a laid-out text, ready to become an element
#[derive(Debug, Clone)]
struct LineTemplate {
    text: String,
    /// Bottom edge of the line
    y: f32,
    align: HorizontalAlign,
}

#[derive(Debug, Clone)]
struct CachedLayout {
    created: Instant,
    lines: Arc<[LineTemplate]>,
}

/// Shows plain multi-line text through temporary per-line elements
pub struct CompatShim {
    config: CompatConfig,
    surface: SurfaceConfig,
    parser: Arc<MarkupParser>,
    layouts: LruCache<String, CachedLayout>,
}

impl CompatShim {
    /// Build a shim with its own layout memo
    pub fn new(config: &HintConfig, parser: Arc<MarkupParser>) -> CacheResult<Self> {
        Ok(Self {
            config: config.compat.clone(),
            surface: config.surface.clone(),
            parser,
            layouts: LruCache::new(config.compat.cache_capacity)?,
        })
    }

    /// Shim sharing the registry's configuration and parser
    pub fn for_registry(registry: &Registry) -> CacheResult<Self> {
        Self::new(registry.config(), Arc::clone(registry.parser()))
    }

    /// Show `text` from `caller` on `session`
    ///
    /// Replaces whatever the shim showed there before. Returns `Ok(false)`
    /// when the shim is disabled globally or for `caller`.
    pub fn show(
        &self,
        session: &Session,
        caller: &str,
        text: &str,
        duration: Option<Duration>,
    ) -> SessionResult<bool> {
        if !self.config.allows(caller) {
            log::debug!("Ignoring text from disabled caller '{}'", caller);
            return Ok(false);
        }

        let owner = self.config.owner.as_str();
        let elements: Vec<Arc<Element>> = self
            .layout(text)
            .iter()
            .enumerate()
            .map(|(index, line)| {
                ElementState::static_text(line.text.clone())
                    .with_id(format!("{}-{}", owner, index))
                    .with_position(0.0, line.y)
                    .with_align(line.align)
                    .with_anchor(VerticalAnchor::Bottom)
                    .with_font_size(self.surface.default_font_size)
                    .with_sync_speed(SyncSpeed::Fast)
                    .build()
            })
            .collect();

        let duration = duration.unwrap_or_else(|| self.config.default_duration());
        session.add_temporary(owner, elements, duration)?;
        Ok(true)
    }

    /// Remove the shim's text from `session`
    pub fn hide(&self, session: &Session) -> usize {
        session.clear(&self.config.owner)
    }

    /// Number of memoized layouts
    pub fn cached_layouts(&self) -> usize {
        self.layouts.len()
    }

    fn layout(&self, text: &str) -> Arc<[LineTemplate]> {
        let now = Instant::now();
        if let Some(cached) = self.layouts.try_get(text) {
            if now.saturating_duration_since(cached.created) <= self.config.cache_window() {
                return cached.lines;
            }
            self.layouts.try_remove(text);
        }

        let parsed = self.parser.parse(text, self.surface.default_font_size);
        let bounds = TextBounds::of(&parsed);

        // centre the block on the baseline
        let mut cursor = self.surface.baseline - bounds.height / 2.0;
        let mut lines = Vec::with_capacity(parsed.len());
        for line in parsed.iter() {
            cursor += line.height();
            if line.is_blank() {
                continue;
            }
            lines.push(LineTemplate {
                text: line.balanced_text(),
                y: cursor,
                align: line.align,
            });
        }

        let lines: Arc<[LineTemplate]> = lines.into();
        self.layouts.add(
            text.to_string(),
            CachedLayout {
                created: now,
                lines: Arc::clone(&lines),
            },
        );
        lines
    }
}

impl std::fmt::Debug for CompatShim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatShim")
            .field("enabled", &self.config.enabled)
            .field("owner", &self.config.owner)
            .field("layouts", &self.layouts.len())
            .finish()
    }
}
