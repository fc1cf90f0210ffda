//! Lightweight in-memory counters for entitlement and checkout activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct PaywallMetrics {
    unlocks: AtomicU64,
    resets: AtomicU64,
    escalations: AtomicU64,
    corrupt_purges: AtomicU64,
    checkouts_completed: AtomicU64,
    checkouts_rejected: AtomicU64,
    field_failures: AtomicU64,
}

static PAYWALL_METRICS: OnceLock<PaywallMetrics> = OnceLock::new();

fn metrics() -> &'static PaywallMetrics {
    PAYWALL_METRICS.get_or_init(PaywallMetrics::default)
}

pub fn record_unlock() {
    metrics().unlocks.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reset() {
    metrics().resets.fetch_add(1, Ordering::Relaxed);
}

pub fn record_escalation() {
    metrics().escalations.fetch_add(1, Ordering::Relaxed);
}

pub fn record_corrupt_purge() {
    metrics().corrupt_purges.fetch_add(1, Ordering::Relaxed);
}

/// Records the outcome of one checkout attempt. `failed_fields` is the
/// number of fields that did not validate (0 on success).
pub fn record_checkout(success: bool, failed_fields: usize) {
    let metrics = metrics();
    if success {
        metrics.checkouts_completed.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics.checkouts_rejected.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .field_failures
        .fetch_add(failed_fields as u64, Ordering::Relaxed);
}

#[derive(Debug, Serialize)]
pub struct PaywallMetricsSnapshot {
    pub unlocks: u64,
    pub resets: u64,
    pub escalations: u64,
    pub corrupt_purges: u64,
    pub checkouts_completed: u64,
    pub checkouts_rejected: u64,
    pub field_failures: u64,
    pub checkout_success_rate: Option<f64>,
}

pub fn snapshot() -> PaywallMetricsSnapshot {
    let metrics = metrics();
    let completed = metrics.checkouts_completed.load(Ordering::Relaxed);
    let rejected = metrics.checkouts_rejected.load(Ordering::Relaxed);

    let attempts = completed + rejected;
    let checkout_success_rate = if attempts > 0 {
        Some(completed as f64 / attempts as f64)
    } else {
        None
    };

    PaywallMetricsSnapshot {
        unlocks: metrics.unlocks.load(Ordering::Relaxed),
        resets: metrics.resets.load(Ordering::Relaxed),
        escalations: metrics.escalations.load(Ordering::Relaxed),
        corrupt_purges: metrics.corrupt_purges.load(Ordering::Relaxed),
        checkouts_completed: completed,
        checkouts_rejected: rejected,
        field_failures: metrics.field_failures.load(Ordering::Relaxed),
        checkout_success_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_flow() {
        // Counters are process-wide and other tests run in parallel, so only
        // assert on deltas.
        let initial = snapshot();

        record_unlock();
        record_reset();
        record_escalation();
        record_corrupt_purge();
        let s1 = snapshot();
        assert!(s1.unlocks > initial.unlocks);
        assert!(s1.resets > initial.resets);
        assert!(s1.escalations > initial.escalations);
        assert!(s1.corrupt_purges > initial.corrupt_purges);

        record_checkout(false, 3);
        let s2 = snapshot();
        assert!(s2.checkouts_rejected > s1.checkouts_rejected);
        assert!(s2.field_failures >= s1.field_failures + 3);

        record_checkout(true, 0);
        let s3 = snapshot();
        assert!(s3.checkouts_completed > s2.checkouts_completed);
        let rate = s3.checkout_success_rate.unwrap();
        assert!((0.0..=1.0).contains(&rate));
    }
}
