// ============================
// crates/backend-lib/src/rate_limit/mod.rs
// ============================
//! Per-key token-bucket admission control.
//!
//! A [`RateLimiter`] holds one bucket per client key (usually the source
//! address). Buckets live in a sharded map; refill and consume for a key run
//! under that key's entry lock, so concurrent requests from one client can
//! never spend the same token twice. The map is bounded: inserting past
//! `max_buckets` evicts the least recently used bucket.

pub mod clock;
pub mod policy;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use policy::{spawn_reclaimer, PolicyLimiter, RateLimiters, RouteClass};

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default cap on tracked keys per limiter
pub const DEFAULT_MAX_BUCKETS: usize = 10_000;

/// At capacity, one eviction pass frees `max_buckets / EVICTION_FRACTION`
/// slots (at least one).
const EVICTION_FRACTION: usize = 16;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(burst: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(burst),
            last_refill: now,
        }
    }

    fn try_acquire(&mut self, rate_per_second: f64, burst: u32, now: Instant) -> bool {
        // A caller that read the clock before taking the entry lock may
        // arrive after a later one; refill time never moves backwards.
        let now = now.max(self.last_refill);
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let capacity = f64::from(burst);

        self.tokens = (self.tokens + elapsed * rate_per_second.max(0.0)).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token-bucket rate limiter keyed by client identity
pub struct RateLimiter<C: Clock = MonotonicClock> {
    buckets: DashMap<String, TokenBucket>,
    max_buckets: usize,
    clock: C,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUCKETS)
    }
}

impl RateLimiter {
    /// Create a limiter on the monotonic system clock
    pub fn new(max_buckets: usize) -> Self {
        Self::with_clock(max_buckets, MonotonicClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(max_buckets: usize, clock: C) -> Self {
        Self {
            buckets: DashMap::new(),
            max_buckets: max_buckets.max(1),
            clock,
        }
    }

    /// Admit or reject one request for `key`.
    ///
    /// A new key starts with a full bucket of `burst` tokens. Tokens refill
    /// at `rate_per_second`, capped at `burst`.
    pub fn allow(&self, key: &str, rate_per_second: f64, burst: u32) -> bool {
        let now = self.clock.now();

        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.try_acquire(rate_per_second, burst, now);
        }

        if self.buckets.len() >= self.max_buckets {
            self.evict_lru();
        }

        let mut bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| TokenBucket::full(burst, now));
        bucket.try_acquire(rate_per_second, burst, now)
    }

    /// Drop every bucket. Clients lose any accumulated burst credit.
    pub fn reset(&self) {
        self.buckets.clear();
    }

    /// Remove buckets untouched for at least `max_idle`; returns how many went
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_refill) < max_idle;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    /// Drop the least recently used buckets in one batch, so a stream of
    /// new keys at capacity scans the map once per batch, not per request.
    fn evict_lru(&self) {
        let mut stamps: Vec<Instant> = self
            .buckets
            .iter()
            .map(|entry| entry.value().last_refill)
            .collect();
        if stamps.is_empty() {
            return;
        }

        let batch = (self.max_buckets / EVICTION_FRACTION).max(1);
        let nth = batch.min(stamps.len()) - 1;
        let (_, cutoff, _) = stamps.select_nth_unstable(nth);
        let cutoff = *cutoff;
        // Buckets tied at the cutoff only fill what is left of the batch
        let older = stamps.iter().filter(|stamp| **stamp < cutoff).count();
        let mut ties = batch.saturating_sub(older);

        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            if bucket.last_refill < cutoff {
                return false;
            }
            if bucket.last_refill == cutoff && ties > 0 {
                ties -= 1;
                return false;
            }
            true
        });
        tracing::debug!(
            evicted = before.saturating_sub(self.buckets.len()),
            "Evicted least recently used rate buckets"
        );
    }
}
