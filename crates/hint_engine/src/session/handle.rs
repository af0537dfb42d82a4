//! Public session handle
//!
//! A session displays the elements of many owners to one viewer. All
//! methods are safe to call from any thread; they only touch the owner
//! groups and post messages to the session's timing loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Sender};
use parking_lot::{Mutex, RwLock};

use super::core::SessionCore;
use super::runner::{ElementLink, Services, SessionMessage, SessionRunner, SessionShared};
use super::sink::OutputSink;
use super::{SessionError, SessionResult};
use crate::ui::Element;

/// Composes the elements of many owners for one viewer
///
/// Created by [`Registry::create_session`](super::Registry::create_session).
/// Dropping the last handle shuts the session down.
pub struct Session {
    shared: Arc<SessionShared>,
    inbox: Sender<SessionMessage>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn spawn(viewer: &str, sink: Box<dyn OutputSink>, services: Services) -> SessionResult<Arc<Session>> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        let core = SessionCore::new(&services.config.schedule, Instant::now())?;
        let shared = Arc::new(SessionShared {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            viewer: Arc::from(viewer),
            groups: RwLock::new(HashMap::new()),
        });

        let (inbox, receiver) = unbounded();
        let runner = SessionRunner::new(Arc::clone(&shared), services, receiver, inbox.clone(), sink, core);
        let thread = thread::Builder::new()
            .name(format!("hint-session-{}", viewer))
            .spawn(move || runner.run())?;

        Ok(Arc::new(Session {
            shared,
            inbox,
            thread: Mutex::new(Some(thread)),
            closed: AtomicBool::new(false),
        }))
    }

    /// Viewer this session renders for
    pub fn viewer(&self) -> &str {
        &self.shared.viewer
    }

    /// Process-unique session number
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Show `element` as part of `owner`'s group
    ///
    /// Adding an element twice to the same group is a no-op. An element
    /// already shown elsewhere is rejected.
    pub fn add(&self, owner: &str, element: Arc<Element>) -> SessionResult<()> {
        self.ensure_open()?;

        {
            let mut groups = self.shared.groups.write();
            if let Some(current) = element.owner_in(self.shared.id) {
                return if current == owner { Ok(()) } else { Err(SessionError::AlreadyAttached) };
            }

            element.attach(ElementLink {
                session_id: self.shared.id,
                owner: owner.to_string(),
                viewer: Arc::clone(&self.shared.viewer),
                inbox: self.inbox.clone(),
            })?;
            groups.entry(owner.to_string()).or_default().push(element);
        }

        self.post(SessionMessage::GroupsChanged);
        Ok(())
    }

    /// Add several elements; stops at the first rejected one
    pub fn add_all<I>(&self, owner: &str, elements: I) -> SessionResult<()>
    where
        I: IntoIterator<Item = Arc<Element>>,
    {
        for element in elements {
            self.add(owner, element)?;
        }
        Ok(())
    }

    /// Remove `element` from whichever group holds it
    pub fn remove(&self, element: &Arc<Element>) -> bool {
        let removed = {
            let mut groups = self.shared.groups.write();
            let Some(owner) = element.owner_in(self.shared.id) else {
                return false;
            };

            if let Some(group) = groups.get_mut(&owner) {
                group.retain(|e| !Arc::ptr_eq(e, element));
                if group.is_empty() {
                    groups.remove(&owner);
                }
            }
            element.detach(self.shared.id)
        };

        if removed {
            self.post(SessionMessage::GroupsChanged);
        }
        removed
    }

    /// Remove every element of `owner` whose id is `id`
    pub fn remove_by_id(&self, owner: &str, id: &str) -> usize {
        let removed: Vec<Arc<Element>> = {
            let mut groups = self.shared.groups.write();
            let Some(group) = groups.get_mut(owner) else {
                return 0;
            };

            let (matching, kept): (Vec<_>, Vec<_>) = std::mem::take(group).into_iter().partition(|e| e.id() == id);
            *group = kept;
            if group.is_empty() {
                groups.remove(owner);
            }
            matching
        };

        for element in &removed {
            element.detach(self.shared.id);
        }
        if !removed.is_empty() {
            self.post(SessionMessage::GroupsChanged);
        }
        removed.len()
    }

    /// Remove every element of `owner`
    pub fn clear(&self, owner: &str) -> usize {
        let removed = self.shared.clear_group(owner);
        self.post(SessionMessage::CancelExpiry(owner.to_string()));
        if removed > 0 {
            self.post(SessionMessage::GroupsChanged);
        }
        removed
    }

    /// Replace `owner`'s group with `elements` for `duration`
    ///
    /// The group is cleared when the duration elapses unless it has been
    /// replaced by another temporary group in the meantime.
    pub fn add_temporary<I>(&self, owner: &str, elements: I, duration: Duration) -> SessionResult<()>
    where
        I: IntoIterator<Item = Arc<Element>>,
    {
        self.ensure_open()?;
        self.clear(owner);
        self.add_all(owner, elements)?;
        // A duration past the end of representable time never expires
        if let Some(at) = Instant::now().checked_add(duration) {
            self.post(SessionMessage::Expire { owner: owner.to_string(), at });
        }
        Ok(())
    }

    /// Elements of `owner`
    pub fn elements(&self, owner: &str) -> Vec<Arc<Element>> {
        self.shared.groups.read().get(owner).cloned().unwrap_or_default()
    }

    /// Elements of every owner
    pub fn all_elements(&self) -> Vec<Arc<Element>> {
        self.shared.all_elements()
    }

    /// Owners with at least one element
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.shared.groups.read().keys().cloned().collect();
        owners.sort();
        owners
    }

    /// Recompute as soon as possible
    pub fn force_update(&self) {
        self.post(SessionMessage::ForceUpdate);
    }

    /// Suspend the timing loop; pending work is kept
    pub fn pause(&self) {
        self.post(SessionMessage::Pause);
    }

    /// Undo [`pause`](Self::pause)
    pub fn resume(&self) {
        self.post(SessionMessage::Resume);
    }

    /// Stop the timing loop and release every element
    ///
    /// A recompute still running is discarded without being delivered.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.post(SessionMessage::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.thread().id() != thread::current().id() && thread.join().is_err() {
                log::error!("Session loop for '{}' terminated abnormally", self.shared.viewer);
            }
        }

        let owners: Vec<String> = self.shared.groups.read().keys().cloned().collect();
        for owner in owners {
            self.shared.clear_group(&owner);
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            Err(SessionError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn post(&self, message: SessionMessage) {
        // Fails only once the loop has stopped
        let _ = self.inbox.send(message);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("viewer", &self.shared.viewer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
