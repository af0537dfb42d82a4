//! Registry lifecycle

use crate::config::ConfigError;
use crate::core::HintConfig;
use crate::session::{ChannelSink, LogSink, Registry, SessionError};

use super::quiet_config;

#[test]
fn test_one_session_per_viewer() {
    let registry = Registry::new(quiet_config()).unwrap();
    registry.create_session("alice", LogSink::default()).unwrap();

    let (sink, _payloads) = ChannelSink::new();
    assert!(matches!(
        registry.create_session("alice", sink),
        Err(SessionError::SessionExists(viewer)) if viewer == "alice"
    ));
}

#[test]
fn test_destroy_session() {
    let registry = Registry::new(quiet_config()).unwrap();
    let session = registry.create_session("bob", LogSink::default()).unwrap();
    assert_eq!(registry.sessions().len(), 1);
    assert_eq!(registry.session("bob").map(|s| s.id()), Some(session.id()));

    assert!(registry.destroy_session("bob"));
    assert!(!registry.destroy_session("bob"));
    assert!(session.is_closed());
    assert!(registry.session("bob").is_none());

    // the viewer can reconnect
    registry.create_session("bob", LogSink::default()).unwrap();
}

#[test]
fn test_shutdown_closes_everything() {
    let registry = Registry::new(quiet_config()).unwrap();
    let a = registry.create_session("a", LogSink::default()).unwrap();
    let b = registry.create_session("b", LogSink::default()).unwrap();

    registry.shutdown();
    assert!(a.is_closed());
    assert!(b.is_closed());
    assert!(registry.sessions().is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = HintConfig::default();
    config.schedule.worker_threads = 0;

    assert!(matches!(
        Registry::new(config),
        Err(SessionError::Config(ConfigError::Invalid(_)))
    ));
}
