//! Sessions composing and delivering on real threads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{collect_for, quiet_config, settle, wait_for};
use crate::session::{ChannelSink, Registry, SessionError, SinkError};
use crate::ui::{ElementState, SyncSpeed};

const PATIENCE: Duration = Duration::from_secs(3);
const IDLE: Duration = Duration::from_millis(800);

#[test]
fn test_added_element_is_delivered() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("alice", sink).unwrap();

    let element = ElementState::static_text("Health 100").with_position(0.0, 900.0).build();
    session.add("status", element).unwrap();

    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("Health 100")).is_some());
}

#[test]
fn test_hidden_element_never_appears() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("bob", sink).unwrap();

    let secret = ElementState::static_text("SECRET").with_hidden(true).build();
    let visible = ElementState::static_text("visible").with_position(0.0, 400.0).build();
    session.add("spy", Arc::clone(&secret)).unwrap();
    session.add("hud", Arc::clone(&visible)).unwrap();

    let first = wait_for(&payloads, PATIENCE, |p| p.contains("visible")).unwrap();
    assert!(!first.contains("SECRET"));

    secret.set_text("STILL SECRET");
    visible.set_text("visible again");
    session.force_update();

    let second = wait_for(&payloads, PATIENCE, |p| p.contains("visible again")).unwrap();
    assert!(!second.contains("SECRET"));
}

#[test]
fn test_two_quick_changes_on_idle_session_yield_one_output() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("olivia", sink).unwrap();

    let a = ElementState::static_text("a-old").with_position(0.0, 300.0).build();
    let b = ElementState::static_text("b-old").with_position(0.0, 600.0).build();
    session.add_all("hud", [Arc::clone(&a), Arc::clone(&b)]).unwrap();
    // idle for longer than the refresh limit
    settle(&payloads, IDLE);

    a.set_text("a-new");
    thread::sleep(Duration::from_millis(10));
    b.set_text("b-new");

    let outputs = collect_for(&payloads, Duration::from_millis(1500));
    assert_eq!(outputs.len(), 1, "expected one coalesced output, got {:?}", outputs);
    assert!(outputs[0].contains("a-new"));
    assert!(outputs[0].contains("b-new"));
}

#[test]
fn test_change_waits_for_predicted_update() {
    let mut config = quiet_config();
    config.schedule.min_output_interval_secs = 0.0;
    config.schedule.settle_secs = 0.0;
    let registry = Registry::new(config).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("peggy", sink).unwrap();

    let a = ElementState::static_text("a-old").with_position(0.0, 300.0).build();
    let b = ElementState::static_text("b-0").with_position(0.0, 600.0).build();
    session.add_all("hud", [Arc::clone(&a), Arc::clone(&b)]).unwrap();
    settle(&payloads, IDLE);

    // b settles into a 200ms rhythm
    for tick in 1..=5 {
        b.set_text(format!("b-{}", tick));
        thread::sleep(Duration::from_millis(if tick == 5 { 60 } else { 200 }));
    }
    while payloads.try_recv().is_ok() {}

    // a waits for b's predicted update instead of going out alone
    a.set_text("a-new");
    thread::sleep(Duration::from_millis(10));
    b.set_text("b-new");

    let outputs = collect_for(&payloads, Duration::from_millis(1000));
    assert_eq!(outputs.len(), 1, "expected one merged output, got {:?}", outputs);
    assert!(outputs[0].contains("a-new"));
    assert!(outputs[0].contains("b-new"));
}

#[test]
fn test_changes_inside_refresh_window_merge() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("carol", sink).unwrap();

    let a = ElementState::static_text("a-old")
        .with_position(0.0, 300.0)
        .with_sync_speed(SyncSpeed::Normal)
        .build();
    let b = ElementState::static_text("b-old")
        .with_position(0.0, 600.0)
        .with_sync_speed(SyncSpeed::Normal)
        .build();
    session.add_all("hud", [Arc::clone(&a), Arc::clone(&b)]).unwrap();
    settle(&payloads, IDLE);

    // a fresh output starts the refresh window both changes fall into
    session.force_update();
    assert!(wait_for(&payloads, PATIENCE, |_| true).is_some());

    a.set_text("a-new");
    thread::sleep(Duration::from_millis(10));
    b.set_text("b-new");

    let outputs = collect_for(&payloads, Duration::from_millis(1500));
    assert_eq!(outputs.len(), 1, "expected one coalesced output, got {:?}", outputs);
    assert!(outputs[0].contains("a-new"));
    assert!(outputs[0].contains("b-new"));
}

#[test]
fn test_failing_callback_leaves_others_intact() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("dave", sink).unwrap();

    let broken = ElementState::static_text("")
        .with_callback(|_| panic!("callback bug"))
        .build();
    let healthy = ElementState::static_text("healthy").with_position(0.0, 500.0).build();
    session.add("plugin", broken).unwrap();
    session.add("hud", healthy).unwrap();

    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("healthy")).is_some());
}

#[test]
fn test_callback_content_is_evaluated_per_pass() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("erin", sink).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    let ticking = ElementState::static_text("")
        .with_position(0.0, 500.0)
        .with_callback(move |ctx| Ok(format!("{} tick {}", ctx.viewer, seen.fetch_add(1, Ordering::SeqCst))))
        .build();
    session.add("clock", Arc::clone(&ticking)).unwrap();

    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("erin tick 0")).is_some());
    ticking.touch();
    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("erin tick 1")).is_some());
}

#[test]
fn test_temporary_group_expires() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("frank", sink).unwrap();

    let toast = ElementState::static_text("toast").with_position(0.0, 200.0).build();
    session
        .add_temporary("notice", [Arc::clone(&toast)], Duration::from_millis(300))
        .unwrap();

    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("toast")).is_some());
    assert!(wait_for(&payloads, PATIENCE, |p| !p.contains("toast")).is_some());
    assert!(session.elements("notice").is_empty());
    assert!(!toast.is_attached());
}

#[test]
fn test_pause_holds_output_until_resume() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("grace", sink).unwrap();

    let element = ElementState::static_text("before").with_position(0.0, 500.0).build();
    session.add("hud", Arc::clone(&element)).unwrap();
    settle(&payloads, IDLE);

    session.pause();
    element.set_text("after");
    assert!(collect_for(&payloads, IDLE).is_empty());

    session.resume();
    assert!(wait_for(&payloads, PATIENCE, |p| p.contains("after")).is_some());
}

#[test]
fn test_remove_and_clear() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink, payloads) = ChannelSink::new();
    let session = registry.create_session("heidi", sink).unwrap();

    let keep = ElementState::static_text("keep").with_id("k").with_position(0.0, 100.0).build();
    let drop_me = ElementState::static_text("drop").with_id("d").with_position(0.0, 200.0).build();
    let twin_a = ElementState::static_text("twin").with_id("t").with_position(0.0, 300.0).build();
    let twin_b = ElementState::static_text("twin").with_id("t").with_position(0.0, 400.0).build();
    session
        .add_all("hud", [Arc::clone(&keep), Arc::clone(&drop_me), twin_a, twin_b])
        .unwrap();
    assert_eq!(session.elements("hud").len(), 4);
    assert_eq!(session.owners(), vec!["hud".to_string()]);

    assert!(session.remove(&drop_me));
    assert!(!session.remove(&drop_me));
    assert_eq!(session.remove_by_id("hud", "t"), 2);
    assert_eq!(session.remove_by_id("hud", "missing"), 0);

    let remaining = session.elements("hud");
    assert_eq!(remaining.len(), 1);
    assert!(Arc::ptr_eq(&remaining[0], &keep));

    let last = wait_for(&payloads, PATIENCE, |p| p.contains("keep") && !p.contains("twin")).unwrap();
    assert!(!last.contains("drop"));

    assert_eq!(session.clear("hud"), 1);
    assert!(session.owners().is_empty());
    assert!(session.all_elements().is_empty());
}

#[test]
fn test_element_belongs_to_one_group() {
    let registry = Registry::new(quiet_config()).unwrap();
    let (sink_a, _a) = ChannelSink::new();
    let (sink_b, _b) = ChannelSink::new();
    let first = registry.create_session("ivan", sink_a).unwrap();
    let second = registry.create_session("judy", sink_b).unwrap();

    let element = ElementState::static_text("shared").build();
    first.add("hud", Arc::clone(&element)).unwrap();
    first.add("hud", Arc::clone(&element)).unwrap();
    assert_eq!(first.elements("hud").len(), 1);

    assert!(matches!(first.add("other", Arc::clone(&element)), Err(SessionError::AlreadyAttached)));
    assert!(matches!(second.add("hud", Arc::clone(&element)), Err(SessionError::AlreadyAttached)));
    assert_eq!(element.viewer().as_deref(), Some("ivan"));

    assert!(first.remove(&element));
    second.add("hud", Arc::clone(&element)).unwrap();
    assert_eq!(element.viewer().as_deref(), Some("judy"));
}

#[test]
fn test_shutdown_stops_delivery_and_releases_elements() {
    let registry = Registry::new(quiet_config()).unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let sink = move |_viewer: &str, _payload: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<(), SinkError>(())
    };
    let session = registry.create_session("mallory", sink).unwrap();

    let element = ElementState::static_text("bye").build();
    session.add("hud", Arc::clone(&element)).unwrap();
    session.shutdown();

    let after_shutdown = delivered.load(Ordering::SeqCst);
    element.set_text("ignored");
    thread::sleep(Duration::from_millis(300));

    assert_eq!(delivered.load(Ordering::SeqCst), after_shutdown);
    assert!(session.is_closed());
    assert!(!element.is_attached());
    assert!(matches!(session.add("hud", element), Err(SessionError::SessionClosed)));
}
