//! Adaptive update-rate estimator
//!
//! Keeps a short history of when an element changed and extrapolates when
//! it will most likely change next. Sessions use the prediction to delay a
//! recompute until a second element is due anyway.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Updates closer together than this count once
pub const MIN_SPACING: Duration = Duration::from_millis(50);

/// Samples older than this are forgotten
pub const RETENTION: Duration = Duration::from_secs(30);

/// Hard cap on stored samples (`RETENTION / MIN_SPACING`)
pub const MAX_SAMPLES: usize = 600;

#[derive(Debug, Default)]
struct EstimatorState {
    samples: VecDeque<Instant>,
    /// Memoized prediction; outer `None` means "not computed yet"
    cached: Option<Option<Instant>>,
}

/// Per-element update history and next-update prediction
#[derive(Debug, Default)]
pub struct UpdateEstimator {
    state: Mutex<EstimatorState>,
}

impl UpdateEstimator {
    /// Create an estimator with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update at `now`
    pub fn record(&self, now: Instant) {
        let mut state = self.state.lock();

        if let Some(&last) = state.samples.back() {
            if now.saturating_duration_since(last) < MIN_SPACING {
                return;
            }
        }

        state.samples.push_back(now);
        while let Some(&oldest) = state.samples.front() {
            let expired = now.saturating_duration_since(oldest) > RETENTION;
            if expired || state.samples.len() > MAX_SAMPLES {
                state.samples.pop_front();
            } else {
                break;
            }
        }
        state.cached = None;
    }

    /// Predicted time of the next update, `None` when unknown
    pub fn estimate_next(&self) -> Option<Instant> {
        let mut state = self.state.lock();
        if let Some(cached) = state.cached {
            return cached;
        }

        let estimate = extrapolate(&state.samples);
        state.cached = Some(estimate);
        estimate
    }

    /// Number of retained samples
    pub fn sample_count(&self) -> usize {
        self.state.lock().samples.len()
    }

    /// Forget all history
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.samples.clear();
        state.cached = None;
    }
}

/// Fit inter-arrival gaps against their index and predict the next gap
fn extrapolate(samples: &VecDeque<Instant>) -> Option<Instant> {
    if samples.len() < 2 {
        return None;
    }

    let gaps: Vec<f64> = samples
        .iter()
        .zip(samples.iter().skip(1))
        .map(|(a, b)| b.saturating_duration_since(*a).as_secs_f64())
        .collect();

    let next_gap = if gaps.len() == 1 {
        gaps[0]
    } else {
        let n = gaps.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = gaps.iter().sum::<f64>() / n;

        let (mut covariance, mut variance) = (0.0, 0.0);
        for (i, gap) in gaps.iter().enumerate() {
            let dx = i as f64 - mean_x;
            covariance += dx * (gap - mean_y);
            variance += dx * dx;
        }

        let slope = covariance / variance;
        let intercept = mean_y - slope * mean_x;
        intercept + slope * n
    };

    if !next_gap.is_finite() || next_gap <= 0.0 {
        return None;
    }

    let last = *samples.back()?;
    last.checked_add(Duration::try_from_secs_f64(next_gap).ok()?)
}
