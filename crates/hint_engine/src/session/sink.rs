//! Output sinks
//!
//! A sink receives every payload a session produces. Each session owns its
//! sink and calls it from its timing loop only, so deliveries for one
//! viewer never overlap.

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Errors reported by an output sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Nobody is listening for this viewer any more
    #[error("Output for viewer '{0}' has no receiver")]
    Disconnected(String),

    /// Delivery failed for another reason
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Destination of composed payloads
pub trait OutputSink: Send {
    /// Replace whatever `viewer` currently sees with `payload`
    fn deliver(&mut self, viewer: &str, payload: &str) -> Result<(), SinkError>;
}

impl<F> OutputSink for F
where
    F: FnMut(&str, &str) -> Result<(), SinkError> + Send,
{
    fn deliver(&mut self, viewer: &str, payload: &str) -> Result<(), SinkError> {
        self(viewer, payload)
    }
}

/// One delivered payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Viewer the payload was composed for
    pub viewer: String,
    /// Marked-up text ready to display
    pub payload: String,
}

/// Forwards payloads into a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<Delivery>,
}

impl ChannelSink {
    /// Sink plus the receiving end of its channel
    pub fn new() -> (Self, Receiver<Delivery>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Sink sending into an existing channel
    pub fn from_sender(sender: Sender<Delivery>) -> Self {
        Self { sender }
    }
}

impl OutputSink for ChannelSink {
    fn deliver(&mut self, viewer: &str, payload: &str) -> Result<(), SinkError> {
        self.sender
            .send(Delivery {
                viewer: viewer.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|_| SinkError::Disconnected(viewer.to_string()))
    }
}

/// Writes payloads to the log
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: log::Level,
}

impl LogSink {
    /// Sink logging every payload at `level`
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl OutputSink for LogSink {
    fn deliver(&mut self, viewer: &str, payload: &str) -> Result<(), SinkError> {
        log::log!(self.level, "[{}] payload ({} bytes):\n{}", viewer, payload.len(), payload);
        Ok(())
    }
}
