//! Session timing loop
//!
//! One named thread per session. It is the only place that starts
//! recomputes and the only caller of the session's sink. Producers talk to
//! it through its inbox; compositions run on the shared pool and report
//! back through the same inbox.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;

use super::core::SessionCore;
use super::sink::OutputSink;
use crate::core::HintConfig;
use crate::schedule::{sync_deadline, MergePolicy, ThreadPool};
use crate::text::MarkupParser;
use crate::ui::{Composer, Composition, Element, ElementKey, PlacementMemory};

/// Longest sleep when nothing is scheduled
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Inbox traffic of a session loop
pub(crate) enum SessionMessage {
    ElementChanged(ElementKey),
    GroupsChanged,
    ForceUpdate,
    Pause,
    Resume,
    Expire { owner: String, at: Instant },
    CancelExpiry(String),
    Composed(Composition),
    ComposeFailed,
    Shutdown,
}

/// Back-reference from an attached element to its session
pub(crate) struct ElementLink {
    pub(crate) session_id: u64,
    pub(crate) owner: String,
    pub(crate) viewer: Arc<str>,
    pub(crate) inbox: Sender<SessionMessage>,
}

/// Owner groups, shared between the handle and the loop
pub(crate) struct SessionShared {
    pub(crate) id: u64,
    pub(crate) viewer: Arc<str>,
    pub(crate) groups: RwLock<HashMap<String, Vec<Arc<Element>>>>,
}

impl SessionShared {
    pub(crate) fn all_elements(&self) -> Vec<Arc<Element>> {
        self.groups.read().values().flatten().cloned().collect()
    }

    /// Remove and detach every element of `owner`
    pub(crate) fn clear_group(&self, owner: &str) -> usize {
        let removed = self.groups.write().remove(owner).unwrap_or_default();
        for element in &removed {
            element.detach(self.id);
        }
        removed.len()
    }
}

/// Read-only collaborators every session shares
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) pool: Arc<ThreadPool>,
    pub(crate) parser: Arc<MarkupParser>,
    pub(crate) config: Arc<HintConfig>,
}

pub(crate) struct SessionRunner {
    shared: Arc<SessionShared>,
    services: Services,
    inbox: Receiver<SessionMessage>,
    outbox: Sender<SessionMessage>,
    sink: Box<dyn OutputSink>,
    core: SessionCore,
    placements: PlacementMemory,
}

enum Flow {
    Continue,
    Stop,
}

impl SessionRunner {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        services: Services,
        inbox: Receiver<SessionMessage>,
        outbox: Sender<SessionMessage>,
        sink: Box<dyn OutputSink>,
        core: SessionCore,
    ) -> Self {
        Self {
            shared,
            services,
            inbox,
            outbox,
            sink,
            core,
            placements: PlacementMemory::new(),
        }
    }

    pub(crate) fn run(mut self) {
        log::info!("Session for '{}' started", self.shared.viewer);

        loop {
            let now = Instant::now();
            let timeout = self
                .core
                .next_wake()
                .map_or(IDLE_WAIT, |at| at.saturating_duration_since(now));

            let received = match self.inbox.recv_timeout(timeout) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match panic::catch_unwind(AssertUnwindSafe(|| self.step(received))) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(_) => log::error!("Session loop for '{}' recovered from a panic", self.shared.viewer),
            }
        }

        log::info!("Session for '{}' stopped", self.shared.viewer);
    }

    fn step(&mut self, received: Option<SessionMessage>) -> Flow {
        let pending = received.into_iter().chain(std::iter::from_fn(|| self.inbox.try_recv().ok()));
        let messages: Vec<SessionMessage> = pending.collect();

        for message in messages {
            if let SessionMessage::Shutdown = message {
                return Flow::Stop;
            }
            self.handle(message, Instant::now());
        }

        self.tick(Instant::now());
        Flow::Continue
    }

    fn handle(&mut self, message: SessionMessage, now: Instant) {
        match message {
            SessionMessage::ElementChanged(key) => self.schedule_change(key, now),
            SessionMessage::GroupsChanged => self.core.request(now, MergePolicy::KeepFastest),
            SessionMessage::ForceUpdate => self.core.force(now),
            SessionMessage::Pause => self.core.pause(now),
            SessionMessage::Resume => self.core.resume(now),
            SessionMessage::Expire { owner, at } => self.core.expire_at(&owner, at),
            SessionMessage::CancelExpiry(owner) => self.core.cancel_expiry(&owner),
            SessionMessage::Composed(composition) => self.deliver(composition, now),
            SessionMessage::ComposeFailed => self.core.abort(now),
            SessionMessage::Shutdown => {}
        }
    }

    /// Piggyback on a soon-expected update of another element when possible
    fn schedule_change(&mut self, key: ElementKey, now: Instant) {
        let elements = self.shared.all_elements();
        let Some(changed) = elements.iter().find(|e| e.key() == key) else {
            return;
        };

        let others = elements
            .iter()
            .filter(|e| e.key() != key && !e.is_hidden())
            .map(|e| (e.sync_speed(), e.estimator().estimate_next()));

        if let Some(at) = sync_deadline(changed.sync_speed(), now, self.services.config.schedule.settle(), others) {
            self.core.request(at, MergePolicy::KeepFastest);
        }
    }

    fn tick(&mut self, now: Instant) {
        for owner in self.core.take_expired(now) {
            let removed = self.shared.clear_group(&owner);
            log::debug!("Expired {} elements of '{}' for '{}'", removed, owner, self.shared.viewer);
            if removed > 0 {
                self.core.request(now, MergePolicy::KeepFastest);
            }
        }

        if self.core.poll(now) {
            self.start_compose(now);
        }
    }

    fn start_compose(&mut self, now: Instant) {
        let elements = self.shared.all_elements();
        let viewer = Arc::clone(&self.shared.viewer);
        let parser = Arc::clone(&self.services.parser);
        let config = Arc::clone(&self.services.config);
        let previous = std::mem::take(&mut self.placements);
        let outbox = self.outbox.clone();

        let job = move || {
            let composer = Composer::new(&parser, &config.surface, &config.placement);
            let result = panic::catch_unwind(AssertUnwindSafe(|| composer.compose(&elements, &viewer, &previous)));
            let message = match result {
                Ok(composition) => SessionMessage::Composed(composition),
                Err(_) => {
                    log::error!("Composition for '{}' panicked", viewer);
                    SessionMessage::ComposeFailed
                }
            };
            // The loop is gone when the session was torn down meanwhile
            let _ = outbox.send(message);
        };

        if let Err(e) = self.services.pool.execute(job) {
            log::error!("Could not start composition for '{}': {}", self.shared.viewer, e);
            self.core.abort(now);
        }
    }

    fn deliver(&mut self, composition: Composition, now: Instant) {
        self.placements = composition.placements;
        log::debug!(
            "Recomputed '{}': {} elements, {} bytes",
            self.shared.viewer,
            composition.rendered,
            composition.payload.len()
        );

        let viewer = &self.shared.viewer;
        let sink = &mut self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(viewer, &composition.payload))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Failed to deliver payload to '{}': {}", viewer, e),
            Err(_) => log::error!("Output sink for '{}' panicked", viewer),
        }
        self.core.complete(now);
    }
}
