//! Registry of live sessions
//!
//! Holds one session per viewer plus the collaborators they share: the
//! worker pool, the markup parser and the configuration. Whoever manages
//! viewer connections owns the registry and creates or destroys sessions
//! as viewers come and go.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::handle::Session;
use super::runner::Services;
use super::sink::OutputSink;
use super::{SessionError, SessionResult};
use crate::core::HintConfig;
use crate::schedule::ThreadPool;
use crate::text::MarkupParser;

/// Owns every viewer's session
pub struct Registry {
    services: Services,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl Registry {
    /// Validate `config` and start the worker pool
    pub fn new(config: HintConfig) -> SessionResult<Self> {
        config.validate()?;

        let parser = MarkupParser::with_bundled_metrics(config.parser.cache_capacity)?;
        let pool = ThreadPool::new(config.schedule.worker_threads)?;
        log::info!(
            "Hint registry ready ({} workers, {} cached layouts)",
            pool.size(),
            config.parser.cache_capacity
        );

        Ok(Self {
            services: Services {
                pool: Arc::new(pool),
                parser: Arc::new(parser),
                config: Arc::new(config),
            },
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Validated configuration
    pub fn config(&self) -> &HintConfig {
        &self.services.config
    }

    /// Parser shared by every session
    pub fn parser(&self) -> &Arc<MarkupParser> {
        &self.services.parser
    }

    /// Start a session for `viewer` delivering into `sink`
    pub fn create_session<S>(&self, viewer: &str, sink: S) -> SessionResult<Arc<Session>>
    where
        S: OutputSink + 'static,
    {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(viewer) {
            return Err(SessionError::SessionExists(viewer.to_string()));
        }

        let session = Session::spawn(viewer, Box::new(sink), self.services.clone())?;
        sessions.insert(viewer.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Live session of `viewer`
    pub fn session(&self, viewer: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(viewer).cloned()
    }

    /// Shut down and forget `viewer`'s session
    pub fn destroy_session(&self, viewer: &str) -> bool {
        let removed = self.sessions.write().remove(viewer);
        match removed {
            Some(session) => {
                session.shutdown();
                true
            }
            None => false,
        }
    }

    /// Every live session
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Shut down every session
    pub fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.shutdown();
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sessions", &self.sessions.read().len())
            .field("pool", &self.services.pool)
            .finish()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
