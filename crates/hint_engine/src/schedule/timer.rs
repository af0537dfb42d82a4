//! Action timer with merge policies and a pausable repeating ticker
//!
//! Both timers are driven with explicit instants so the owning loop decides
//! what "now" is. Neither spawns threads or sleeps.

use std::time::{Duration, Instant};

use super::{ScheduleError, ScheduleResult};

/// How a new request combines with an already scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep whichever deadline is earlier
    KeepFastest,
    /// Keep whichever deadline is later
    KeepSlowest,
    /// Replace the deadline unconditionally
    Override,
}

impl MergePolicy {
    fn merge(self, current: Instant, requested: Instant) -> Instant {
        match self {
            MergePolicy::KeepFastest => current.min(requested),
            MergePolicy::KeepSlowest => current.max(requested),
            MergePolicy::Override => requested,
        }
    }
}

/// Single pending deadline that fires once
#[derive(Debug, Clone, Default)]
pub struct ActionTimer {
    next_action: Option<Instant>,
    paused: bool,
}

impl ActionTimer {
    /// Unscheduled, running timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the action `delay` after `now`, merged with any pending deadline
    ///
    /// A delay too long to represent means "never": it leaves an earlier
    /// deadline alone under [`MergePolicy::KeepFastest`] and unschedules the
    /// action under the other policies. Returns the resulting deadline.
    pub fn schedule(&mut self, now: Instant, delay: Duration, policy: MergePolicy) -> Option<Instant> {
        match now.checked_add(delay) {
            Some(requested) => Some(self.schedule_at(requested, policy)),
            None => {
                if policy != MergePolicy::KeepFastest {
                    self.next_action = None;
                }
                self.next_action
            }
        }
    }

    /// Request the action at an absolute instant
    pub fn schedule_at(&mut self, at: Instant, policy: MergePolicy) -> Instant {
        let next = match self.next_action {
            Some(current) => policy.merge(current, at),
            None => at,
        };
        self.next_action = Some(next);
        next
    }

    /// Consume the deadline if it has passed
    ///
    /// The deadline is cleared before returning `true`, so requests made by
    /// the action itself start a fresh schedule.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        match self.next_action {
            Some(at) if at <= now => {
                self.next_action = None;
                true
            }
            _ => false,
        }
    }

    /// Pending deadline, if any
    pub fn next_action(&self) -> Option<Instant> {
        self.next_action
    }

    /// Deadline the owner should wake for; `None` while paused
    pub fn wake_at(&self) -> Option<Instant> {
        if self.paused {
            None
        } else {
            self.next_action
        }
    }

    /// Drop the pending deadline
    pub fn cancel(&mut self) {
        self.next_action = None;
    }

    /// Hold the deadline without firing; requests still merge
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Let a held deadline fire again
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the timer is held
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Fixed-period ticker that can be paused and resumed
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    interval: Duration,
    next_tick: Instant,
    paused_at: Option<Instant>,
}

impl RepeatingTimer {
    /// First tick fires one `interval` after `now`
    pub fn new(interval: Duration, now: Instant) -> ScheduleResult<Self> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self {
            interval,
            next_tick: now + interval,
            paused_at: None,
        })
    }

    /// Returns `true` once per elapsed period; missed periods collapse into one tick
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.paused_at.is_some() || now < self.next_tick {
            return false;
        }

        self.next_tick += self.interval;
        if self.next_tick <= now {
            self.next_tick = now + self.interval;
        }
        true
    }

    /// Next tick, `None` while paused
    pub fn next_tick(&self) -> Option<Instant> {
        match self.paused_at {
            Some(_) => None,
            None => Some(self.next_tick),
        }
    }

    /// Current period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the period; the next tick is one new period after `now`
    pub fn set_interval(&mut self, interval: Duration, now: Instant) -> ScheduleResult<()> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        self.interval = interval;
        self.next_tick = now + interval;
        Ok(())
    }

    /// Stop ticking, remembering when
    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Resume keeping the time that was left when paused
    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.next_tick += now.saturating_duration_since(paused_at);
        }
    }

    /// Whether the ticker is stopped
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}
