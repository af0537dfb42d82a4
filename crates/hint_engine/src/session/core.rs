//! Per-session timing state
//!
//! Everything that decides when a session recomputes, without threads or
//! clocks: the owning loop passes `now` in and asks what to do next.
//!
//! - Change requests merge into one pending action
//! - At most one recompute is in flight; requests made meanwhile are
//!   replayed when it completes
//! - Outputs are spaced at least `min_output_interval` apart unless forced
//! - A periodic tick forces a recompute once the output goes stale
//! - Owner groups can be given a deadline after which they are cleared

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::ScheduleConfig;
use crate::schedule::{ActionTimer, MergePolicy, RepeatingTimer, ScheduleResult};

/// Timing state machine of one session
#[derive(Debug, Clone)]
pub struct SessionCore {
    action: ActionTimer,
    ticker: RepeatingTimer,
    staleness: Duration,
    min_output_interval: Duration,
    in_flight: bool,
    /// Earliest request made while in flight
    deferred: Option<Instant>,
    /// A forced recompute was requested while in flight
    deferred_force: bool,
    last_output: Option<Instant>,
    expirations: HashMap<String, Instant>,
}

impl SessionCore {
    /// Idle core whose staleness ticker starts at `now`
    pub fn new(config: &ScheduleConfig, now: Instant) -> ScheduleResult<Self> {
        Ok(Self {
            action: ActionTimer::new(),
            ticker: RepeatingTimer::new(config.tick_interval(), now)?,
            staleness: config.staleness(),
            min_output_interval: config.min_output_interval(),
            in_flight: false,
            deferred: None,
            deferred_force: false,
            last_output: None,
            expirations: HashMap::new(),
        })
    }

    /// Ask for a recompute at `at`
    ///
    /// Never earlier than the refresh limit allows.
    pub fn request(&mut self, at: Instant, policy: MergePolicy) {
        if self.in_flight {
            self.deferred = Some(self.deferred.map_or(at, |d| d.min(at)));
            return;
        }

        let at = match self.last_output {
            Some(last) => at.max(last + self.min_output_interval),
            None => at,
        };
        self.action.schedule_at(at, policy);
    }

    /// Recompute as soon as possible, ignoring the refresh limit
    pub fn force(&mut self, now: Instant) {
        if self.in_flight {
            self.deferred_force = true;
            return;
        }
        self.action.schedule_at(now, MergePolicy::Override);
    }

    /// Whether a recompute should start now
    ///
    /// On `true` the session is in flight until [`complete`](Self::complete)
    /// or [`abort`](Self::abort).
    pub fn poll(&mut self, now: Instant) -> bool {
        let ticked = self.ticker.poll(now);
        if self.in_flight {
            return false;
        }

        let stale = ticked
            && self
                .last_output
                .map_or(true, |last| now.saturating_duration_since(last) >= self.staleness);
        let due = self.action.take_due(now);

        if due || stale {
            self.action.cancel();
            self.in_flight = true;
            return true;
        }
        false
    }

    /// The in-flight recompute delivered its output
    pub fn complete(&mut self, now: Instant) {
        self.last_output = Some(now);
        self.finish(now);
    }

    /// The in-flight recompute produced nothing
    pub fn abort(&mut self, now: Instant) {
        self.finish(now);
    }

    fn finish(&mut self, now: Instant) {
        self.in_flight = false;
        if std::mem::take(&mut self.deferred_force) {
            self.deferred = None;
            self.force(now);
        } else if let Some(at) = self.deferred.take() {
            self.request(at, MergePolicy::KeepFastest);
        }
    }

    /// Stop the recompute timer and the staleness tick
    pub fn pause(&mut self, now: Instant) {
        self.action.pause();
        self.ticker.pause(now);
    }

    /// Restart both timers, keeping any pending deadline
    pub fn resume(&mut self, now: Instant) {
        self.action.resume();
        self.ticker.resume(now);
    }

    /// Whether the session is paused
    pub fn is_paused(&self) -> bool {
        self.action.is_paused()
    }

    /// Whether an output is being composed
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Pending recompute deadline
    pub fn next_action(&self) -> Option<Instant> {
        self.action.next_action()
    }

    /// When the last output was emitted
    pub fn last_output(&self) -> Option<Instant> {
        self.last_output
    }

    /// Clear `owner`'s group at `at`, replacing any earlier deadline
    pub fn expire_at(&mut self, owner: &str, at: Instant) {
        self.expirations.insert(owner.to_string(), at);
    }

    /// Drop the expiry scheduled for `owner`, if any
    pub fn cancel_expiry(&mut self, owner: &str) {
        self.expirations.remove(owner);
    }

    /// Owners whose deadline has passed; held while paused
    pub fn take_expired(&mut self, now: Instant) -> Vec<String> {
        if self.is_paused() {
            return Vec::new();
        }

        let expired: Vec<String> = self
            .expirations
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(owner, _)| owner.clone())
            .collect();
        for owner in &expired {
            self.expirations.remove(owner);
        }
        expired
    }

    /// When the loop should next wake up
    pub fn next_wake(&self) -> Option<Instant> {
        let expiry = if self.is_paused() {
            None
        } else {
            self.expirations.values().min().copied()
        };

        [self.action.wake_at(), self.ticker.next_tick(), expiry]
            .into_iter()
            .flatten()
            .min()
    }
}
