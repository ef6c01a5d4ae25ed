//! Versioning metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for trigger outcomes and history plan reuse.
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    rows_stamped: AtomicU64,
    excluded_only_updates: AtomicU64,
    same_transaction_updates: AtomicU64,
    history_rows_archived: AtomicU64,
    generated_always_rejections: AtomicU64,
    row_version_anomalies: AtomicU64,
    insert_plan_hits: AtomicU64,
    insert_plan_prepares: AtomicU64,
    insert_plan_refreshes: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_rows_stamped(&self) {
        self.rows_stamped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_excluded_only_updates(&self) {
        self.excluded_only_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_same_transaction_updates(&self) {
        self.same_transaction_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_history_rows_archived(&self) {
        self.history_rows_archived.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_generated_always_rejections(&self) {
        self.generated_always_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_row_version_anomalies(&self) {
        self.row_version_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_insert_plan_hits(&self) {
        self.insert_plan_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_insert_plan_prepares(&self) {
        self.insert_plan_prepares.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_insert_plan_refreshes(&self) {
        self.insert_plan_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn history_rows_archived(&self) -> u64 {
        self.history_rows_archived.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_stamped: self.rows_stamped.load(Ordering::Relaxed),
            excluded_only_updates: self.excluded_only_updates.load(Ordering::Relaxed),
            same_transaction_updates: self.same_transaction_updates.load(Ordering::Relaxed),
            history_rows_archived: self.history_rows_archived.load(Ordering::Relaxed),
            generated_always_rejections: self.generated_always_rejections.load(Ordering::Relaxed),
            row_version_anomalies: self.row_version_anomalies.load(Ordering::Relaxed),
            insert_plan_hits: self.insert_plan_hits.load(Ordering::Relaxed),
            insert_plan_prepares: self.insert_plan_prepares.load(Ordering::Relaxed),
            insert_plan_refreshes: self.insert_plan_refreshes.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_stamped: u64,
    pub excluded_only_updates: u64,
    pub same_transaction_updates: u64,
    pub history_rows_archived: u64,
    pub generated_always_rejections: u64,
    pub row_version_anomalies: u64,
    pub insert_plan_hits: u64,
    pub insert_plan_prepares: u64,
    pub insert_plan_refreshes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_reflects_increments() {
        let metrics = MetricsRegistry::new();
        metrics.increment_rows_stamped();
        metrics.increment_rows_stamped();
        metrics.increment_history_rows_archived();

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_stamped, 2);
        assert_eq!(snap.history_rows_archived, 1);
        assert_eq!(metrics.history_rows_archived(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.increment_row_version_anomalies();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().row_version_anomalies, 400);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(MetricsRegistry::new().snapshot()).unwrap();
        assert_eq!(json["insert_plan_refreshes"], 0);
    }
}
