//! Element handle and its mutable state
//!
//! Elements are shared as `Arc<Element>` between the caller that owns them
//! and the session that displays them. Every observable mutation records an
//! update on the element's estimator and, when attached, pushes a change
//! message into the owning session's inbox. Producers never block on the
//! session.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use super::core::{ElementKey, HorizontalAlign, SyncSpeed, VerticalAnchor};
use super::dynamic_text::DynamicLayout;
use super::static_text::StaticLayout;
use crate::schedule::UpdateEstimator;
use crate::session::{ElementLink, SessionError, SessionMessage};

/// Font size used when none is given
pub const DEFAULT_FONT_SIZE: i32 = 20;

/// Error returned by a content callback
pub type ContentError = Box<dyn std::error::Error + Send + Sync>;

/// Text producer evaluated at composition time
pub type ContentCallback = Arc<dyn Fn(&ContentContext<'_>) -> Result<String, ContentError> + Send + Sync>;

/// What a content callback gets to look at
pub struct ContentContext<'a> {
    /// Element being composed
    pub element: &'a Element,
    /// Viewer of the session composing it
    pub viewer: &'a str,
}

/// Text of an element
#[derive(Clone)]
pub enum Content {
    /// Fixed markup
    Text(String),
    /// Markup produced on demand
    Callback(ContentCallback),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Static or floating placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementKind {
    /// Fixed position chosen by the caller
    Static(StaticLayout),
    /// Position searched around a target
    Dynamic(DynamicLayout),
}

/// Observable fields of an element
///
/// Doubles as a builder: configure with the `with_*` methods and finish
/// with [`ElementState::build`].
#[derive(Debug, Clone)]
pub struct ElementState {
    /// Caller-chosen identifier, not required to be unique
    pub id: String,
    /// Hidden elements keep their place in the registry but are not drawn
    pub hidden: bool,
    /// Point size used to scale the text
    pub font_size: i32,
    /// How eagerly a change is published
    pub sync_speed: SyncSpeed,
    /// Literal text or a callback producing it
    pub content: Content,
    /// Static or floating placement
    pub kind: ElementKind,
}

impl ElementState {
    /// Static element showing `text` at the origin
    pub fn static_text(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            hidden: false,
            font_size: DEFAULT_FONT_SIZE,
            sync_speed: SyncSpeed::default(),
            content: Content::Text(text.into()),
            kind: ElementKind::Static(StaticLayout::default()),
        }
    }

    /// Floating element showing `text` with its target at the origin
    pub fn dynamic_text(text: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Dynamic(DynamicLayout::default()),
            ..Self::static_text(text)
        }
    }

    /// Set the identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Start hidden
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the point size
    pub fn with_font_size(mut self, font_size: i32) -> Self {
        self.font_size = font_size;
        self
    }

    /// Set how eagerly changes are published
    pub fn with_sync_speed(mut self, sync_speed: SyncSpeed) -> Self {
        self.sync_speed = sync_speed;
        self
    }

    /// Replace the text with a callback evaluated at composition time
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ContentContext<'_>) -> Result<String, ContentError> + Send + Sync + 'static,
    {
        self.content = Content::Callback(Arc::new(callback));
        self
    }

    /// Position of a static element, target of a floating one
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.set_position(x, y);
        self
    }

    /// Horizontal alignment; ignored by floating elements
    pub fn with_align(mut self, align: HorizontalAlign) -> Self {
        if let ElementKind::Static(layout) = &mut self.kind {
            layout.align = align;
        }
        self
    }

    /// Vertical anchor; ignored by floating elements
    pub fn with_anchor(mut self, anchor: VerticalAnchor) -> Self {
        if let ElementKind::Static(layout) = &mut self.kind {
            layout.anchor = anchor;
        }
        self
    }

    /// Replace the whole placement description
    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Edit the floating layout in place; ignored by static elements
    pub fn with_dynamic(mut self, edit: impl FnOnce(&mut DynamicLayout)) -> Self {
        if let ElementKind::Dynamic(layout) = &mut self.kind {
            edit(layout);
        }
        self
    }

    /// Finish the builder
    pub fn build(self) -> Arc<Element> {
        Element::new(self)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        match &mut self.kind {
            ElementKind::Static(layout) => {
                layout.x = x;
                layout.y = y;
            }
            ElementKind::Dynamic(layout) => {
                layout.target_x = x;
                layout.target_y = y;
            }
        }
    }
}

/// One independently managed piece of text
pub struct Element {
    key: ElementKey,
    state: RwLock<ElementState>,
    estimator: UpdateEstimator,
    link: Mutex<Option<ElementLink>>,
}

impl Element {
    /// Detached element with a fresh key
    pub fn new(state: ElementState) -> Arc<Self> {
        Arc::new(Self {
            key: ElementKey::next(),
            state: RwLock::new(state),
            estimator: UpdateEstimator::new(),
            link: Mutex::new(None),
        })
    }

    /// Process-unique key
    pub fn key(&self) -> ElementKey {
        self.key
    }

    /// Current identifier
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    /// Whether the element is currently hidden
    pub fn is_hidden(&self) -> bool {
        self.state.read().hidden
    }

    /// Current point size
    pub fn font_size(&self) -> i32 {
        self.state.read().font_size
    }

    /// Current sync speed
    pub fn sync_speed(&self) -> SyncSpeed {
        self.state.read().sync_speed
    }

    /// Current placement description
    pub fn kind(&self) -> ElementKind {
        self.state.read().kind
    }

    /// Copy of every observable field
    pub fn snapshot(&self) -> ElementState {
        self.state.read().clone()
    }

    /// Update history of this element
    pub fn estimator(&self) -> &UpdateEstimator {
        &self.estimator
    }

    /// Viewer of the session the element is attached to
    pub fn viewer(&self) -> Option<Arc<str>> {
        self.link.lock().as_ref().map(|link| Arc::clone(&link.viewer))
    }

    /// Whether the element belongs to a session
    pub fn is_attached(&self) -> bool {
        self.link.lock().is_some()
    }

    /// Change the identifier
    pub fn set_id(&self, id: impl Into<String>) {
        let id = id.into();
        self.mutate(|state| replace(&mut state.id, id));
    }

    /// Show or hide the element
    pub fn set_hidden(&self, hidden: bool) {
        self.mutate(|state| replace(&mut state.hidden, hidden));
    }

    /// Change the point size
    pub fn set_font_size(&self, font_size: i32) {
        self.mutate(|state| replace(&mut state.font_size, font_size));
    }

    /// Change how eagerly later updates are published
    pub fn set_sync_speed(&self, sync_speed: SyncSpeed) {
        self.mutate(|state| replace(&mut state.sync_speed, sync_speed));
    }

    /// Replace the content with literal text; identical text is not a change
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.mutate(|state| {
            if matches!(&state.content, Content::Text(current) if *current == text) {
                return false;
            }
            state.content = Content::Text(text);
            true
        });
    }

    /// Replace the content with a callback evaluated at composition time
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&ContentContext<'_>) -> Result<String, ContentError> + Send + Sync + 'static,
    {
        self.mutate(|state| {
            state.content = Content::Callback(Arc::new(callback));
            true
        });
    }

    /// Position of a static element, target of a floating one
    pub fn set_position(&self, x: f32, y: f32) {
        self.mutate(|state| {
            let before = state.kind;
            state.set_position(x, y);
            state.kind != before
        });
    }

    /// Replace the whole placement description
    pub fn set_kind(&self, kind: ElementKind) {
        self.mutate(|state| replace(&mut state.kind, kind));
    }

    /// Mark the content as changed without editing it
    ///
    /// Callback elements use this to say their output would differ now.
    pub fn touch(&self) {
        self.mutate(|_| true);
    }

    /// Edit several fields at once, raising a single change
    pub fn update(&self, edit: impl FnOnce(&mut ElementState)) {
        self.mutate(|state| {
            edit(state);
            true
        });
    }

    /// Current text; callbacks are evaluated without holding any lock
    ///
    /// A failing or panicking callback yields empty text, which keeps the
    /// element out of the payload for this pass.
    pub fn resolve_text(&self, viewer: &str) -> String {
        let content = self.state.read().content.clone();
        let callback = match content {
            Content::Text(text) => return text,
            Content::Callback(callback) => callback,
        };

        let context = ContentContext { element: self, viewer };
        match panic::catch_unwind(AssertUnwindSafe(|| callback(&context))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::warn!("Content callback of element '{}' failed: {}", self.id(), e);
                String::new()
            }
            Err(_) => {
                log::warn!("Content callback of element '{}' panicked", self.id());
                String::new()
            }
        }
    }

    fn mutate(&self, edit: impl FnOnce(&mut ElementState) -> bool) {
        let raise = {
            let mut state = self.state.write();
            let was_hidden = state.hidden;
            let changed = edit(&mut state);
            changed && !(was_hidden && state.hidden)
        };
        if raise {
            self.notify_changed();
        }
    }

    fn notify_changed(&self) {
        self.estimator.record(Instant::now());
        if let Some(link) = self.link.lock().as_ref() {
            // A closed inbox means the session is shutting down
            let _ = link.inbox.send(SessionMessage::ElementChanged(self.key));
        }
    }

    pub(crate) fn attach(&self, link: ElementLink) -> Result<(), SessionError> {
        let mut current = self.link.lock();
        if current.is_some() {
            return Err(SessionError::AlreadyAttached);
        }
        *current = Some(link);
        Ok(())
    }

    /// Detach if attached to `session_id`
    pub(crate) fn detach(&self, session_id: u64) -> bool {
        let mut current = self.link.lock();
        match current.as_ref() {
            Some(link) if link.session_id == session_id => {
                *current = None;
                true
            }
            _ => false,
        }
    }

    /// Owner group within `session_id`, if attached there
    pub(crate) fn owner_in(&self, session_id: u64) -> Option<String> {
        self.link
            .lock()
            .as_ref()
            .filter(|link| link.session_id == session_id)
            .map(|link| link.owner.clone())
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Element")
            .field("key", &self.key)
            .field("id", &state.id)
            .field("hidden", &state.hidden)
            .field("kind", &state.kind)
            .finish()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::elements::Priority;
    use crossbeam::channel::unbounded;

    fn attached(element: &Element) -> crossbeam::channel::Receiver<SessionMessage> {
        let (inbox, receiver) = unbounded();
        element
            .attach(ElementLink {
                session_id: 7,
                owner: "test".to_string(),
                viewer: Arc::from("viewer"),
                inbox,
            })
            .unwrap();
        receiver
    }

    fn changes(receiver: &crossbeam::channel::Receiver<SessionMessage>) -> usize {
        receiver
            .try_iter()
            .filter(|m| matches!(m, SessionMessage::ElementChanged(_)))
            .count()
    }

    #[test]
    fn test_builder() {
        let element = ElementState::static_text("hello")
            .with_id("greeting")
            .with_position(10.0, 300.0)
            .with_align(HorizontalAlign::Left)
            .with_anchor(VerticalAnchor::Top)
            .with_font_size(32)
            .build();

        assert_eq!(element.id(), "greeting");
        assert_eq!(element.font_size(), 32);
        match element.kind() {
            ElementKind::Static(layout) => {
                assert_eq!((layout.x, layout.y), (10.0, 300.0));
                assert_eq!(layout.align, HorizontalAlign::Left);
                assert_eq!(layout.anchor, VerticalAnchor::Top);
            }
            ElementKind::Dynamic(_) => panic!("expected a static element"),
        }
        assert_eq!(element.resolve_text("viewer"), "hello");
    }

    #[test]
    fn test_dynamic_builder_sets_target() {
        let element = ElementState::dynamic_text("float")
            .with_position(50.0, 400.0)
            .with_dynamic(|layout| layout.priority = Priority::High)
            .build();

        match element.kind() {
            ElementKind::Dynamic(layout) => {
                assert_eq!((layout.target_x, layout.target_y), (50.0, 400.0));
                assert_eq!(layout.priority, Priority::High);
            }
            ElementKind::Static(_) => panic!("expected a floating element"),
        }
    }

    #[test]
    fn test_mutation_notifies_session() {
        let element = ElementState::static_text("a").build();
        let receiver = attached(&element);

        element.set_text("b");
        element.set_font_size(30);
        assert_eq!(changes(&receiver), 2);
    }

    #[test]
    fn test_unchanged_value_is_silent() {
        let element = ElementState::static_text("a").build();
        let receiver = attached(&element);

        element.set_text("a");
        element.set_hidden(false);
        assert_eq!(changes(&receiver), 0);
    }

    #[test]
    fn test_hidden_element_stays_silent() {
        let element = ElementState::static_text("a").with_hidden(true).build();
        let receiver = attached(&element);

        element.set_text("b");
        element.update(|state| state.font_size = 40);
        assert_eq!(changes(&receiver), 0);

        element.set_hidden(false);
        assert_eq!(changes(&receiver), 1);

        element.set_hidden(true);
        assert_eq!(changes(&receiver), 1);
    }

    #[test]
    fn test_attach_twice_fails() {
        let element = ElementState::static_text("a").build();
        let _receiver = attached(&element);

        let (inbox, _other) = unbounded();
        let second = element.attach(ElementLink {
            session_id: 8,
            owner: "other".to_string(),
            viewer: Arc::from("viewer"),
            inbox,
        });
        assert!(matches!(second, Err(SessionError::AlreadyAttached)));

        assert!(!element.detach(8));
        assert!(element.detach(7));
        assert!(!element.is_attached());
    }

    #[test]
    fn test_callback_sees_viewer() {
        let element = ElementState::static_text("")
            .with_id("clock")
            .with_callback(|ctx| Ok(format!("{}:{}", ctx.element.id(), ctx.viewer)))
            .build();
        assert_eq!(element.resolve_text("alice"), "clock:alice");
    }

    #[test]
    fn test_failing_callback_resolves_empty() {
        let failing = ElementState::static_text("")
            .with_callback(|_| Err("no data".into()))
            .build();
        assert_eq!(failing.resolve_text("viewer"), "");

        let panicking = ElementState::static_text("")
            .with_callback(|_| panic!("callback bug"))
            .build();
        assert_eq!(panicking.resolve_text("viewer"), "");
    }

    #[test]
    fn test_mutation_feeds_estimator() {
        let element = ElementState::static_text("a").build();
        element.set_text("b");
        assert_eq!(element.estimator().sample_count(), 1);
    }
}
