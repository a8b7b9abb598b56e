//! # Campaign Metrics Collector
//!
//! Performance counters and period-over-period deltas for one campaign.
//! The bundled implementation returns mock data shaped like the real
//! ad-platform reporting APIs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{round1, round2, Collect, CollectorError, TtlCache};

/// Campaign performance metrics for the current analysis window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub campaign_name: String,
    pub platform: String,

    // Current period counters
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: f64,
    /// Cost per acquisition
    pub cpa: f64,
    /// Click-through rate (%)
    pub ctr: f64,
    /// Conversion rate (%)
    pub cvr: f64,
    /// Cost per mille
    pub cpm: f64,

    // Comparison to the previous period
    pub cpa_change_pct: f64,
    pub ctr_change_pct: f64,
    pub cvr_change_pct: f64,
    pub spend_change_pct: f64,

    // Time range
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub comparison_period_start: DateTime<Utc>,
    pub comparison_period_end: DateTime<Utc>,

    // Budget context
    pub budget: f64,
    pub budget_utilization_pct: f64,
    pub days_running: i64,
}

/// Derived rates with zero-denominator guards: a rate is 0 when its
/// denominator is 0, never NaN or infinity.
fn derived_rates(impressions: u64, clicks: u64, conversions: u64, spend: f64) -> (f64, f64, f64, f64) {
    let cpa = if conversions > 0 {
        spend / conversions as f64
    } else {
        0.0
    };
    let ctr = if impressions > 0 {
        clicks as f64 / impressions as f64 * 100.0
    } else {
        0.0
    };
    let cvr = if clicks > 0 {
        conversions as f64 / clicks as f64 * 100.0
    } else {
        0.0
    };
    let cpm = if impressions > 0 {
        spend / impressions as f64 * 1000.0
    } else {
        0.0
    };
    (cpa, ctr, cvr, cpm)
}

/// Collects campaign performance data from ad platforms.
///
/// Stub implementation returning mock data; production swaps in the
/// platform reporting APIs behind the same `Collect` contract.
pub struct CampaignMetricsCollector {
    cache: TtlCache<CampaignMetrics>,
    window_days: i64,
}

impl CampaignMetricsCollector {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::default(),
            window_days: 7,
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    fn mock_metrics(campaign_id: &str, days: i64) -> CampaignMetrics {
        let mut rng = rand::rng();

        let impressions: u64 = rng.random_range(50_000..=150_000);
        let clicks = (impressions as f64 * rng.random_range(0.01..0.05)) as u64;
        let conversions = (clicks as f64 * rng.random_range(0.02..0.08)) as u64;
        let spend = rng.random_range(3_000.0..8_000.0);

        let (cpa, ctr, cvr, cpm) = derived_rates(impressions, clicks, conversions, spend);

        let cpa_change = rng.random_range(-40.0..50.0);
        let ctr_change = rng.random_range(-20.0..30.0);
        let cvr_change = rng.random_range(-25.0..25.0);
        let spend_change = rng.random_range(-10.0..20.0);

        let budget = 10_000.0;
        let now = Utc::now();
        let suffix = campaign_id
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| &campaign_id[i..])
            .unwrap_or(campaign_id);

        CampaignMetrics {
            campaign_id: campaign_id.to_string(),
            campaign_name: format!("Campaign {suffix}"),
            platform: "google_ads".to_string(),
            impressions,
            clicks,
            conversions,
            spend: round2(spend),
            cpa: round2(cpa),
            ctr: round2(ctr),
            cvr: round2(cvr),
            cpm: round2(cpm),
            cpa_change_pct: round1(cpa_change),
            ctr_change_pct: round1(ctr_change),
            cvr_change_pct: round1(cvr_change),
            spend_change_pct: round1(spend_change),
            period_start: now - Duration::days(days),
            period_end: now,
            comparison_period_start: now - Duration::days(days * 2),
            comparison_period_end: now - Duration::days(days),
            budget,
            budget_utilization_pct: round1(spend / budget * 100.0),
            days_running: days,
        }
    }
}

impl Default for CampaignMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collect for CampaignMetricsCollector {
    type Output = CampaignMetrics;

    async fn collect(&self, campaign_id: &str) -> Result<CampaignMetrics, CollectorError> {
        let cache_key = format!("{campaign_id}:days={}", self.window_days);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let metrics = Self::mock_metrics(campaign_id, self.window_days);
        self.cache.put(&cache_key, metrics.clone());
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_denominators_yield_zero_rates() {
        let (cpa, ctr, cvr, cpm) = derived_rates(0, 0, 0, 500.0);
        assert_eq!(cpa, 0.0);
        assert_eq!(ctr, 0.0);
        assert_eq!(cvr, 0.0);
        assert_eq!(cpm, 0.0);
    }

    #[test]
    fn test_derived_rates() {
        let (cpa, ctr, cvr, cpm) = derived_rates(100_000, 2_000, 100, 5_000.0);
        assert_eq!(cpa, 50.0);
        assert_eq!(ctr, 2.0);
        assert_eq!(cvr, 5.0);
        assert_eq!(cpm, 50.0);
    }

    #[tokio::test]
    async fn test_collect_is_cached() {
        let collector = CampaignMetricsCollector::new();
        let first = collector.collect("camp_1234").await.unwrap();
        let second = collector.collect("camp_1234").await.unwrap();
        // Mock data is random per generation, so identical values mean a cache hit
        assert_eq!(first.impressions, second.impressions);
        assert_eq!(first.spend, second.spend);
    }

    #[tokio::test]
    async fn test_mock_metrics_invariants() {
        let collector = CampaignMetricsCollector::new();
        let metrics = collector.collect("camp_9999").await.unwrap();
        assert!(metrics.clicks <= metrics.impressions);
        assert!(metrics.conversions <= metrics.clicks);
        assert!(metrics.cpa >= 0.0 && metrics.ctr >= 0.0);
        assert_eq!(metrics.days_running, 7);
        assert_eq!(metrics.campaign_name, "Campaign 9999");
    }
}
