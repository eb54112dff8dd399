//! Core priority limiter implementation.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::config::LimiterConfig;

use super::bucket::Bucket;
use super::key::ClientKey;
use super::limits::Limits;
use super::priority::Priority;

/// Smallest shard count dashmap accepts.
const MIN_SHARDS: usize = 2;
/// Largest shard count a limiter will allocate.
const MAX_SHARDS: usize = 4096;

/// A per-key token bucket limiter with high and low priority tiers.
///
/// Buckets are created lazily at full capacity the first time a key is seen
/// and are never removed except by [`PriorityLimiter::clear`]. The map is
/// sharded; every check for a given key runs under that key's shard lock
/// from lookup through mutation, so calls for one key are strictly
/// serialized while keys on other shards proceed in parallel.
///
/// This struct is thread-safe and can be shared across threads.
pub struct PriorityLimiter<K = ClientKey> {
    /// Effective limits after clamping
    limits: Limits,
    /// Bucket state indexed by client key
    buckets: DashMap<K, Bucket>,
}

impl<K> PriorityLimiter<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a limiter with the given refill rate, burst capacity and reserve floor.
    ///
    /// A `reserve` larger than `capacity` is clamped to `capacity`; see
    /// [`Limits::reserve_clamped`].
    pub fn new(rate: f64, capacity: f64, reserve: f64) -> Self {
        Self::with_limits(Limits::new(rate, capacity, reserve))
    }

    /// Create a limiter from precomputed limits.
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            buckets: DashMap::new(),
        }
    }

    /// Create a limiter whose key space is split across `shards` partitions.
    ///
    /// The shard count is rounded up to a power of two and kept within
    /// `[2, 4096]`.
    pub fn with_shards(limits: Limits, shards: usize) -> Self {
        let shards = shard_amount(shards);
        debug!(shards = shards, "Creating sharded priority limiter");

        Self {
            limits,
            buckets: DashMap::with_shard_amount(shards),
        }
    }

    /// Create a limiter from loaded configuration.
    pub fn from_config(config: &LimiterConfig) -> Self {
        let limits = config.limits();
        match config.shards {
            Some(shards) => Self::with_shards(limits, shards),
            None => Self::with_limits(limits),
        }
    }

    /// Decide whether a request from `key` at `priority` is admitted at time `now`.
    ///
    /// The bucket is refilled for the time elapsed since its last check and
    /// its baseline moves to `now` whether or not the request is admitted.
    /// An admitted request costs exactly one token at either priority.
    pub fn allow<Q>(&self, key: &Q, priority: Priority, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + Debug + ?Sized,
    {
        self.check(key, Some(priority), now)
    }

    /// Like [`PriorityLimiter::allow`], but takes a raw priority code.
    ///
    /// Unrecognized codes are denied after the bucket has been refilled.
    pub fn allow_code<Q>(&self, key: &Q, code: i32, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + Debug + ?Sized,
    {
        let priority = Priority::from_code(code);
        if priority.is_none() {
            debug!(key = ?key, code = code, "Unrecognized priority, denying");
        }
        self.check(key, priority, now)
    }

    fn check<Q>(&self, key: &Q, priority: Option<Priority>, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + Debug + ?Sized,
    {
        trace!(key = ?key, priority = ?priority, "Checking admission");

        // Fast path avoids allocating an owned key for buckets that already exist
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return self.admit(key, &mut bucket, priority, now);
        }

        let mut bucket = self.buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(
                key = ?key,
                tokens = self.limits.capacity(),
                "Creating new bucket"
            );
            Bucket::full(&self.limits, now)
        });
        self.admit(key, &mut bucket, priority, now)
    }

    fn admit<Q>(
        &self,
        key: &Q,
        bucket: &mut Bucket,
        priority: Option<Priority>,
        now: Instant,
    ) -> bool
    where
        Q: Debug + ?Sized,
    {
        bucket.refill(now, &self.limits);

        let Some(priority) = priority else {
            return false;
        };

        let admitted = bucket.try_take(self.limits.threshold(priority));
        if !admitted {
            debug!(
                key = ?key,
                priority = %priority,
                tokens = bucket.tokens(),
                reserve = self.limits.reserve(),
                "Request denied"
            );
        }
        admitted
    }

    /// Get the effective limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Get the stored token level for a key without refilling it.
    ///
    /// Returns `None` if the key has never been seen.
    pub fn tokens<Q>(&self, key: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.get(key).map(|bucket| bucket.tokens())
    }

    /// Get the number of tracked buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Remove all buckets.
    ///
    /// Keys seen afterwards start again at full capacity.
    pub fn clear(&self) {
        self.buckets.clear();
    }
}

/// Normalize a requested shard count to a power of two dashmap accepts.
fn shard_amount(requested: usize) -> usize {
    match requested.max(MIN_SHARDS).checked_next_power_of_two() {
        Some(shards) if shards <= MAX_SHARDS => shards,
        _ => {
            warn!(
                shards = requested,
                max = MAX_SHARDS,
                "Shard count too large, clamping to maximum"
            );
            MAX_SHARDS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_limiter_creation() {
        let limiter: PriorityLimiter = PriorityLimiter::new(1.0, 10.0, 6.0);

        assert_eq!(limiter.bucket_count(), 0);
        assert_eq!(limiter.limits().reserve(), 6.0);
    }

    #[test]
    fn test_allow_creates_full_bucket() {
        let limiter: PriorityLimiter = PriorityLimiter::new(1.0, 10.0, 6.0);
        let key = ClientKey::Id(42);

        assert!(limiter.allow(&key, Priority::High, Instant::now()));
        assert_eq!(limiter.bucket_count(), 1);
        assert_eq!(limiter.tokens(&key), Some(9.0));
    }

    #[test]
    fn test_unknown_key_has_no_tokens() {
        let limiter: PriorityLimiter = PriorityLimiter::new(1.0, 10.0, 6.0);

        assert_eq!(limiter.tokens(&ClientKey::Id(1)), None);
    }

    #[test]
    fn test_borrowed_string_keys() {
        let limiter: PriorityLimiter<String> = PriorityLimiter::new(1.0, 2.0, 0.0);
        let now = Instant::now();

        assert!(limiter.allow("alice", Priority::Low, now));
        assert!(limiter.allow("alice", Priority::Low, now));
        assert!(!limiter.allow("alice", Priority::Low, now));
        assert_eq!(limiter.tokens("alice"), Some(0.0));
    }

    #[test]
    fn test_keys_have_separate_buckets() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 1.0, 0.0);
        let now = Instant::now();

        assert!(limiter.allow(&1_i64, Priority::High, now));
        assert!(!limiter.allow(&1_i64, Priority::High, now));
        assert!(limiter.allow(&2_i64, Priority::High, now));
        assert_eq!(limiter.bucket_count(), 2);
    }

    #[test]
    fn test_low_refused_below_reserve_high_still_admitted() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 4.0, 3.0);
        let now = Instant::now();

        assert!(limiter.allow(&7_i64, Priority::Low, now));
        assert!(limiter.allow(&7_i64, Priority::Low, now));
        assert!(!limiter.allow(&7_i64, Priority::Low, now));
        assert_eq!(limiter.tokens(&7_i64), Some(2.0));

        assert!(limiter.allow(&7_i64, Priority::High, now));
        assert!(limiter.allow(&7_i64, Priority::High, now));
        assert!(!limiter.allow(&7_i64, Priority::High, now));
        assert_eq!(limiter.tokens(&7_i64), Some(0.0));
    }

    #[test]
    fn test_zero_reserve_matches_high() {
        let low: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 3.0, 0.0);
        let high: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 3.0, 0.0);
        let now = Instant::now();

        for _ in 0..5 {
            assert_eq!(
                low.allow(&1_i64, Priority::Low, now),
                high.allow(&1_i64, Priority::High, now)
            );
        }
        assert_eq!(low.tokens(&1_i64), high.tokens(&1_i64));
    }

    #[test]
    fn test_full_reserve_requires_full_bucket() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 5.0, 5.0);
        let start = Instant::now();

        assert!(limiter.allow(&1_i64, Priority::Low, start));
        assert!(!limiter.allow(&1_i64, Priority::Low, start + Duration::from_millis(500)));
        assert!(limiter.allow(&1_i64, Priority::Low, start + Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_capacity_always_denies() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 0.0, 0.0);
        let start = Instant::now();

        assert!(!limiter.allow(&1_i64, Priority::High, start));
        assert!(!limiter.allow(&1_i64, Priority::Low, start + Duration::from_secs(10)));
        assert_eq!(limiter.tokens(&1_i64), Some(0.0));
    }

    #[test]
    fn test_unknown_priority_code_denied_after_refill() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 10.0, 0.0);
        let start = Instant::now();

        for _ in 0..4 {
            assert!(limiter.allow_code(&1_i64, Priority::High.code(), start));
        }
        assert_eq!(limiter.tokens(&1_i64), Some(6.0));

        assert!(!limiter.allow_code(&1_i64, 9, start + Duration::from_secs(2)));
        assert_eq!(limiter.tokens(&1_i64), Some(8.0));

        // The baseline moved with the denied call, so no time is counted twice
        assert!(limiter.allow_code(&1_i64, Priority::Low.code(), start + Duration::from_secs(2)));
        assert_eq!(limiter.tokens(&1_i64), Some(7.0));
    }

    #[test]
    fn test_with_shards_rounds_up() {
        let limits = Limits::new(1.0, 10.0, 0.0);
        let limiter: PriorityLimiter<i64> = PriorityLimiter::with_shards(limits, 3);

        let now = Instant::now();
        for key in 0..100_i64 {
            assert!(limiter.allow(&key, Priority::High, now));
        }
        assert_eq!(limiter.bucket_count(), 100);
    }

    #[test]
    fn test_shard_amount_normalized() {
        assert_eq!(shard_amount(0), 2);
        assert_eq!(shard_amount(1), 2);
        assert_eq!(shard_amount(3), 4);
        assert_eq!(shard_amount(64), 64);
        assert_eq!(shard_amount(5000), MAX_SHARDS);
        assert_eq!(shard_amount(usize::MAX), MAX_SHARDS);
    }

    #[test]
    fn test_from_config_with_huge_shard_count() {
        let config = LimiterConfig::from_yaml("shards: 18446744073709551615
").unwrap();
        assert_eq!(config.shards, Some(usize::MAX));

        let limiter: PriorityLimiter<i64> = PriorityLimiter::from_config(&config);
        assert!(limiter.allow(&1_i64, Priority::High, Instant::now()));
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn test_clear_buckets() {
        let limiter: PriorityLimiter<i64> = PriorityLimiter::new(1.0, 1.0, 0.0);
        let now = Instant::now();

        assert!(limiter.allow(&1_i64, Priority::High, now));
        assert!(!limiter.allow(&1_i64, Priority::High, now));
        assert_eq!(limiter.bucket_count(), 1);

        limiter.clear();
        assert_eq!(limiter.bucket_count(), 0);
        assert!(limiter.allow(&1_i64, Priority::High, now));
    }
}
