//! Cross-module scenarios
//!
//! Sessions here run on real threads; helpers collect payloads from a
//! channel sink with generous timeouts.

mod end_to_end;
mod registry;

use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;

use crate::core::HintConfig;
use crate::session::Delivery;

/// Defaults with the staleness tick pushed out of the way
pub(crate) fn quiet_config() -> HintConfig {
    let mut config = HintConfig::default();
    config.schedule.staleness_secs = 30.0;
    config
}

/// First payload matching `accept` within `timeout`
pub(crate) fn wait_for(
    payloads: &Receiver<Delivery>,
    timeout: Duration,
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match payloads.recv_timeout(remaining) {
            Ok(delivery) if accept(&delivery.payload) => return Some(delivery.payload),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

/// Every payload delivered within `window`
pub(crate) fn collect_for(payloads: &Receiver<Delivery>, window: Duration) -> Vec<String> {
    let deadline = Instant::now() + window;
    let mut collected = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match payloads.recv_timeout(remaining) {
            Ok(delivery) => collected.push(delivery.payload),
            Err(_) => return collected,
        }
    }
}

/// Drain payloads until none arrives for `idle`
pub(crate) fn settle(payloads: &Receiver<Delivery>, idle: Duration) {
    while payloads.recv_timeout(idle).is_ok() {}
}
