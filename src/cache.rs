//! In-process cache of completed scans.
//!
//! Keys are the serialized scan request, so two identical requests share one
//! scan. Entries never change once stored; the only invalidation is
//! [`ScanCache::flush`], which drops everything. The cache holds at most
//! `capacity` scans and evicts the oldest insert when full.

use crate::models::ScanReport;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default number of scans kept.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Entries {
    reports: HashMap<String, Arc<ScanReport>>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct ScanCache {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl Default for ScanCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ScanCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Serialize a request into its cache key.
    pub fn key_for<T: Serialize>(request: &T) -> Result<String, serde_json::Error> {
        serde_json::to_string(request)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<ScanReport>> {
        let entries = self.entries.read().await;
        entries.reports.get(key).cloned()
    }

    /// Store a report unless the key is already present; the stored report is
    /// returned either way.
    pub async fn insert(&self, key: String, report: ScanReport) -> Arc<ScanReport> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.reports.get(&key) {
            debug!("Scan already cached; keeping the first result");
            return Arc::clone(existing);
        }

        while entries.reports.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.reports.remove(&oldest);
            debug!("Evicted oldest cached scan");
        }

        let report = Arc::new(report);
        entries.order.push_back(key.clone());
        entries.reports.insert(key, Arc::clone(&report));
        report
    }

    /// Drop every entry, returning how many were removed.
    pub async fn flush(&self) -> usize {
        let mut entries = self.entries.write().await;
        let flushed = entries.reports.len();
        entries.reports.clear();
        entries.order.clear();
        info!(flushed, "Flushed scan cache");
        flushed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(ms: u64) -> ScanReport {
        ScanReport {
            scanned_at: "2026-10-19T00:00:00Z".to_string(),
            duration_millis: ms,
            sites: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache = ScanCache::default();
        assert!(cache.get("k").await.is_none());
        cache.insert("k".to_string(), report(1)).await;
        assert_eq!(cache.get("k").await.unwrap().duration_millis, 1);
    }

    #[tokio::test]
    async fn test_first_insert_wins() {
        let cache = ScanCache::default();
        cache.insert("k".to_string(), report(1)).await;
        let stored = cache.insert("k".to_string(), report(2)).await;
        assert_eq!(stored.duration_millis, 1);
        assert_eq!(cache.get("k").await.unwrap().duration_millis, 1);
    }

    #[tokio::test]
    async fn test_flush_clears_all() {
        let cache = ScanCache::default();
        cache.insert("a".to_string(), report(1)).await;
        cache.insert("b".to_string(), report(2)).await;
        assert_eq!(cache.flush().await, 2);
        assert_eq!(cache.len().await, 0);
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.flush().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = ScanCache::new(2);
        cache.insert("a".to_string(), report(1)).await;
        cache.insert("b".to_string(), report(2)).await;
        cache.insert("c".to_string(), report(3)).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }

    #[test]
    fn test_key_is_stable() {
        let a = ScanCache::key_for(&vec!["the the", "a a"]).unwrap();
        let b = ScanCache::key_for(&vec!["the the", "a a"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ScanCache::key_for(&vec!["a a", "the the"]).unwrap());
    }
}
