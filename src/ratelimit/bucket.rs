//! Per-key token bucket state.

use std::time::Instant;

use super::limits::Limits;

/// Cost of a single admitted request, regardless of priority.
const REQUEST_COST: f64 = 1.0;

/// Token state for a single client key.
///
/// A bucket is not synchronized on its own; the limiter holds the lock for
/// its key while refilling and deciding.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Current token level, always within `[0, capacity]`
    tokens: f64,
    /// When the token level was last brought up to date
    last_refill: Instant,
}

impl Bucket {
    /// Create a bucket at full capacity.
    pub fn full(limits: &Limits, now: Instant) -> Self {
        Self {
            tokens: limits.capacity(),
            last_refill: now,
        }
    }

    /// Get the current token level.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Get the time of the last refill.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Add the tokens accrued since the last refill and move the baseline to `now`.
    ///
    /// A `now` earlier than the last refill counts as zero elapsed time.
    pub fn refill(&mut self, now: Instant, limits: &Limits) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let added = (elapsed * limits.rate()).max(0.0);

        self.tokens = (self.tokens + added).clamp(0.0, limits.capacity());
        self.last_refill = now;
    }

    /// Take one token if the level is at least `threshold`.
    ///
    /// A whole token must also be available, so the level never goes negative.
    /// Returns `true` if the request is admitted.
    pub fn try_take(&mut self, threshold: f64) -> bool {
        if self.tokens < threshold || self.tokens < REQUEST_COST {
            return false;
        }

        self.tokens -= REQUEST_COST;
        true
    }
}
