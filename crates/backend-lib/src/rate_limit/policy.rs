//! Route-class policies and periodic bucket reclamation.
//!
//! Each route class gets its own [`RateLimiter`] so a client's export budget
//! and its general budget never share a bucket.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{Clock, MonotonicClock, RateLimiter};
use crate::config::{RateLimitSettings, RatePolicy};
use crate::observability::metrics;

/// `tokio::time::interval` panics on a zero period
const MIN_RECLAIM_INTERVAL: Duration = Duration::from_millis(1);

/// Classes of inbound operations with distinct limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    General,
    /// Bulk export/import
    Export,
    /// Credential checks
    Login,
}

impl RouteClass {
    pub const ALL: [RouteClass; 3] = [RouteClass::General, RouteClass::Export, RouteClass::Login];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Export => "export",
            RouteClass::Login => "login",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A limiter bound to one policy
pub struct PolicyLimiter<C: Clock = MonotonicClock> {
    class: RouteClass,
    policy: RatePolicy,
    limiter: RateLimiter<C>,
}

impl<C: Clock> PolicyLimiter<C> {
    pub fn new(class: RouteClass, policy: RatePolicy, limiter: RateLimiter<C>) -> Self {
        Self {
            class,
            policy,
            limiter,
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    pub fn check(&self, key: &str) -> bool {
        let allowed = self
            .limiter
            .allow(key, self.policy.rate_per_second, self.policy.burst);
        if !allowed {
            tracing::warn!(client = %key, class = %self.class, "Rate limit exceeded");
            metrics::record_rate_limited(self.class.as_str());
        }
        allowed
    }
}

/// The full set of per-class limiters
pub struct RateLimiters<C: Clock = MonotonicClock> {
    general: PolicyLimiter<C>,
    export: PolicyLimiter<C>,
    login: PolicyLimiter<C>,
}

impl RateLimiters {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::with_clock(settings, MonotonicClock)
    }
}

impl<C: Clock + Clone> RateLimiters<C> {
    pub fn with_clock(settings: &RateLimitSettings, clock: C) -> Self {
        let build = |class, policy| {
            PolicyLimiter::new(
                class,
                policy,
                RateLimiter::with_clock(settings.max_buckets, clock.clone()),
            )
        };
        Self {
            general: build(RouteClass::General, settings.general),
            export: build(RouteClass::Export, settings.export),
            login: build(RouteClass::Login, settings.login),
        }
    }
}

impl<C: Clock> RateLimiters<C> {
    pub fn get(&self, class: RouteClass) -> &PolicyLimiter<C> {
        match class {
            RouteClass::General => &self.general,
            RouteClass::Export => &self.export,
            RouteClass::Login => &self.login,
        }
    }

    /// Admit or reject a request of `class` from `key`
    pub fn check(&self, class: RouteClass, key: &str) -> bool {
        self.get(class).check(key)
    }

    pub fn reset(&self) {
        for class in RouteClass::ALL {
            self.get(class).limiter().reset();
        }
        metrics::record_bucket_count(0);
    }

    /// Evict idle buckets in every class; returns the total removed
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut removed = 0;
        let mut remaining = 0;
        for class in RouteClass::ALL {
            let limiter = self.get(class).limiter();
            removed += limiter.evict_idle(max_idle);
            remaining += limiter.len();
        }
        metrics::record_buckets_evicted(removed);
        metrics::record_bucket_count(remaining);
        removed
    }
}

/// Periodically evict buckets idle for longer than `idle_ttl`.
///
/// The task runs until the returned handle is aborted.
pub fn spawn_reclaimer<C>(
    limiters: Arc<RateLimiters<C>>,
    interval: Duration,
    idle_ttl: Duration,
) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_RECLAIM_INTERVAL));
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiters.evict_idle(idle_ttl);
            if removed > 0 {
                tracing::debug!(removed, "Reclaimed idle rate buckets");
            }
        }
    })
}
