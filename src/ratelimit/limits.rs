//! Effective limiter configuration.

use tracing::warn;

use super::priority::Priority;

/// The refill rate, burst capacity and reserve floor a limiter enforces.
///
/// Construction never fails. Out-of-range values are corrected instead, and
/// the corrected values are what the accessors report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    rate: f64,
    capacity: f64,
    reserve: f64,
    requested_reserve: f64,
    reserve_clamped: bool,
}

impl Limits {
    /// Create limits from raw values.
    ///
    /// A `reserve` above `capacity`, or a NaN `reserve`, is clamped to
    /// `capacity`. A negative capacity is treated as zero, which denies
    /// every request.
    pub fn new(rate: f64, capacity: f64, reserve: f64) -> Self {
        let capacity = capacity.max(0.0);
        let reserve_clamped = reserve.is_nan() || reserve > capacity;
        let effective_reserve = if reserve_clamped {
            warn!(
                reserve = reserve,
                capacity = capacity,
                "Reserve out of range, clamping to capacity"
            );
            capacity
        } else {
            reserve
        };

        Self {
            rate,
            capacity,
            reserve: effective_reserve,
            requested_reserve: reserve,
            reserve_clamped,
        }
    }

    /// Tokens added per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum tokens a bucket may hold.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Effective reserve floor for low-priority requests.
    pub fn reserve(&self) -> f64 {
        self.reserve
    }

    /// The reserve originally requested, before clamping.
    pub fn requested_reserve(&self) -> f64 {
        self.requested_reserve
    }

    /// Whether the requested reserve had to be clamped to capacity.
    pub fn reserve_clamped(&self) -> bool {
        self.reserve_clamped
    }

    /// The minimum token level at which a request of this priority is admitted.
    pub fn threshold(&self, priority: Priority) -> f64 {
        match priority {
            Priority::High => 1.0,
            Priority::Low => self.reserve,
        }
    }
}
