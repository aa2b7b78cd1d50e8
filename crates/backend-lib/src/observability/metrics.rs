// ==============================================
// crates/backend-lib/src/observability/metrics.rs
// ==============================================

//! Central place for metric keys.
//!
//! Without an installed recorder every call here is a no-op.
use ::metrics::{counter, gauge};

pub const ACCOUNT_CREATED: &str = "account.created";
pub const ACCOUNT_UPDATED: &str = "account.updated";
pub const ACCOUNT_DELETED: &str = "account.deleted";
pub const AUTH_SUCCEEDED: &str = "auth.succeeded";
pub const AUTH_FAILED: &str = "auth.failed";
pub const RATE_LIMITED: &str = "rate_limit.rejected";
pub const RATE_BUCKETS: &str = "rate_limit.buckets";
pub const RATE_BUCKETS_EVICTED: &str = "rate_limit.evicted";

pub fn record_account_created() {
    counter!(ACCOUNT_CREATED).increment(1);
}

pub fn record_account_updated() {
    counter!(ACCOUNT_UPDATED).increment(1);
}

pub fn record_account_deleted() {
    counter!(ACCOUNT_DELETED).increment(1);
}

pub fn record_auth(success: bool) {
    if success {
        counter!(AUTH_SUCCEEDED).increment(1);
    } else {
        counter!(AUTH_FAILED).increment(1);
    }
}

pub fn record_rate_limited(class: &'static str) {
    counter!(RATE_LIMITED, "class" => class).increment(1);
}

pub fn record_buckets_evicted(count: usize) {
    counter!(RATE_BUCKETS_EVICTED).increment(count as u64);
}

pub fn record_bucket_count(count: usize) {
    gauge!(RATE_BUCKETS).set(count as f64);
}
