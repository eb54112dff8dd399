//! Admission control trait for abstracting limiter implementations.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

use super::limiter::PriorityLimiter;
use super::priority::Priority;

/// Trait for admission control implementations.
///
/// Request-handling code can hold an `Arc<dyn AdmissionControl<K>>` and
/// stay independent of how decisions are made.
pub trait AdmissionControl<K>: Send + Sync {
    /// Decide whether a request from `key` at `priority` is admitted at time `now`.
    fn allow(&self, key: &K, priority: Priority, now: Instant) -> bool;
}

impl<K> AdmissionControl<K> for PriorityLimiter<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
{
    fn allow(&self, key: &K, priority: Priority, now: Instant) -> bool {
        PriorityLimiter::allow(self, key, priority, now)
    }
}
