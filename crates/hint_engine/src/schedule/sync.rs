//! Sync-speed piggybacking
//!
//! When an element changes, the session may hold the recompute briefly if
//! another element is predicted to change soon, so both land in one output.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How long an element's change may wait for others
///
/// Ordered from slowest to fastest, so `a >= b` reads "a is at least as fast as b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SyncSpeed {
    /// Never triggers a recompute on its own
    Unsynced,
    /// Waits up to 3s
    Slowest,
    /// Waits up to 1s
    Slow,
    /// Waits up to 300ms
    #[default]
    Normal,
    /// Waits up to 100ms
    Fast,
    /// Publishes immediately
    Fastest,
}

impl SyncSpeed {
    /// Longest wait for a piggyback; `None` for [`SyncSpeed::Unsynced`]
    pub fn max_wait(self) -> Option<Duration> {
        match self {
            SyncSpeed::Fastest => Some(Duration::ZERO),
            SyncSpeed::Fast => Some(Duration::from_millis(100)),
            SyncSpeed::Normal => Some(Duration::from_millis(300)),
            SyncSpeed::Slow => Some(Duration::from_secs(1)),
            SyncSpeed::Slowest => Some(Duration::from_secs(3)),
            SyncSpeed::Unsynced => None,
        }
    }
}

/// Pick the recompute instant for a change to an element of speed `changed`
///
/// `others` yields the speed and predicted next update of every other visible
/// element. Only elements at least as fast as `changed` whose prediction falls
/// inside the wait window are considered; the soonest one wins. With no
/// candidate the recompute waits `settle` (never longer than the speed's
/// window) so that unpredicted changes arriving together still merge.
/// Returns `None` for unsynced elements, which never schedule a recompute.
pub fn sync_deadline<I>(changed: SyncSpeed, now: Instant, settle: Duration, others: I) -> Option<Instant>
where
    I: IntoIterator<Item = (SyncSpeed, Option<Instant>)>,
{
    let max_wait = changed.max_wait()?;
    if max_wait.is_zero() {
        return Some(now);
    }

    let window_end = now + max_wait;
    let piggyback = others
        .into_iter()
        .filter(|(speed, _)| *speed >= changed)
        .filter_map(|(_, estimate)| estimate)
        .filter(|estimate| *estimate > now && *estimate < window_end)
        .min();

    Some(piggyback.unwrap_or_else(|| now + settle.min(max_wait)))
}
