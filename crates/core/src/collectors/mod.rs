//! # Telemetry Collectors
//!
//! Pluggable collectors for the three campaign data sources, plus the
//! [`ContextBuilder`] that fans out to all of them in parallel.
//!
//! ## Data Flow
//!
//! ```text
//! campaign_id → [campaign_metrics | creative_metrics | competitor_signals]
//!                     (concurrent, fail-fast)
//!                          → CampaignContext → render() → LLM brief
//! ```
//!
//! The bundled collectors return mock telemetry; production deployments
//! swap in implementations backed by the real ad-platform APIs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod campaign;
pub mod competitor;
pub mod context;
pub mod creative;

pub use campaign::{CampaignMetrics, CampaignMetricsCollector};
pub use competitor::{
    CompetitorActivity, CompetitorSignals, CompetitorSignalsCollector, PressureLevel,
};
pub use context::{CampaignContext, ContextBuilder};
pub use creative::{CreativeAsset, CreativeMetrics, CreativeMetricsCollector, CreativeTrend};

/// A sub-collector failure, naming the collector that failed
#[derive(Debug, Clone, Error)]
#[error("{collector} collection failed: {reason}")]
pub struct CollectorError {
    pub collector: &'static str,
    pub reason: String,
}

impl CollectorError {
    pub fn new(collector: &'static str, reason: impl Into<String>) -> Self {
        Self {
            collector,
            reason: reason.into(),
        }
    }
}

/// A telemetry source for one campaign data record
///
/// Implementations must be safe to call repeatedly for the same campaign
/// (idempotent observation).
#[async_trait]
pub trait Collect: Send + Sync {
    type Output: Send;

    async fn collect(&self, campaign_id: &str) -> Result<Self::Output, CollectorError>;
}

/// Time-bounded cache keyed by campaign id and collection parameters.
///
/// Interior mutex so a collector instance shared across concurrent runs
/// stays safe; a race between two writers of the same key just recomputes.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (T, Instant)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let (value, stored_at) = entries.get(key)?;
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value, Instant::now()));
        }
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        // 5 minutes, matching the upstream telemetry refresh interval
        Self::new(Duration::from_secs(300))
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("camp_1", 42u32);
        assert_eq!(cache.get("camp_1"), Some(42));
        assert_eq!(cache.get("camp_2"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.put("camp_1", 42u32);
        assert_eq!(cache.get("camp_1"), None);
    }

    #[test]
    fn test_collector_error_names_collector() {
        let err = CollectorError::new("creative_metrics", "upstream timeout");
        assert!(err.to_string().contains("creative_metrics"));
    }
}
