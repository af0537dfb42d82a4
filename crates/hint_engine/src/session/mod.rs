//! Per-viewer sessions
//!
//! A [`Registry`] owns one [`Session`] per viewer. Each session groups
//! elements by owner, decides when to recompute through its
//! [`SessionCore`], and hands every payload to its [`OutputSink`].

pub mod core;
pub mod sink;
pub mod handle;
pub mod registry;
mod runner;

pub use self::core::SessionCore;
pub use sink::{ChannelSink, Delivery, LogSink, OutputSink, SinkError};
pub use handle::Session;
pub use registry::Registry;

pub(crate) use runner::{ElementLink, SessionMessage};

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::schedule::ScheduleError;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by sessions and the registry
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The element is already shown by a session
    #[error("Element is already attached to a session")]
    AlreadyAttached,

    /// The session has been shut down
    #[error("Session is closed")]
    SessionClosed,

    /// A session for this viewer is already running
    #[error("Session for viewer '{0}' already exists")]
    SessionExists(String),

    /// The timing loop thread could not be started
    #[error("Failed to spawn session thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Scheduling setup failed
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Layout cache setup failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
