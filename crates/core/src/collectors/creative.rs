//! # Creative Metrics Collector
//!
//! Creative performance and fatigue signals for one campaign.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{round1, round2, Collect, CollectorError, TtlCache};

/// Direction of a creative performance metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreativeTrend {
    Improving,
    Stable,
    Declining,
}

impl CreativeTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            CreativeTrend::Improving => "improving",
            CreativeTrend::Stable => "stable",
            CreativeTrend::Declining => "declining",
        }
    }
}

/// Individual creative asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeAsset {
    pub asset_id: String,
    /// image, video, text
    pub asset_type: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub age_days: u32,
}

/// Creative performance and fatigue indicators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeMetrics {
    pub campaign_id: String,

    pub total_creatives: u32,
    pub avg_creative_age_days: u32,
    pub avg_ctr: f64,
    pub ctr_trend: CreativeTrend,

    /// Average impressions per user
    pub frequency: f64,
    pub engagement_rate: f64,
    pub engagement_trend: CreativeTrend,

    pub top_performers: Vec<CreativeAsset>,
    pub underperformers: Vec<CreativeAsset>,

    pub fatigue_detected: bool,
    pub refresh_recommended: bool,
    pub refresh_reasoning: String,

    pub collected_at: DateTime<Utc>,
}

/// Fatigue predicate: creatives older than 30 days, frequency above 6.0
/// impressions per user, or a declining CTR trend.
pub fn fatigue_detected(avg_age_days: u32, frequency: f64, ctr_trend: CreativeTrend) -> bool {
    avg_age_days > 30 || frequency > 6.0 || ctr_trend == CreativeTrend::Declining
}

/// Collects creative performance and fatigue signals.
///
/// Stub implementation returning mock data shaped like the real
/// creative-reporting endpoints.
pub struct CreativeMetricsCollector {
    cache: TtlCache<CreativeMetrics>,
}

impl CreativeMetricsCollector {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::default(),
        }
    }

    fn random_trend(rng: &mut impl Rng) -> CreativeTrend {
        match rng.random_range(0..3) {
            0 => CreativeTrend::Improving,
            1 => CreativeTrend::Stable,
            _ => CreativeTrend::Declining,
        }
    }

    fn mock_metrics(campaign_id: &str) -> CreativeMetrics {
        let mut rng = rand::rng();

        let total_creatives: u32 = rng.random_range(3..=10);
        let avg_age: u32 = rng.random_range(5..=45);
        let avg_ctr = rng.random_range(1.5..4.0);
        let frequency = round1(rng.random_range(2.5..8.0));
        let engagement_rate = rng.random_range(0.5..3.0);
        let ctr_trend = Self::random_trend(&mut rng);
        let engagement_trend = Self::random_trend(&mut rng);

        let top_performers = (0..total_creatives.min(3))
            .map(|i| CreativeAsset {
                asset_id: format!("asset_{i}"),
                asset_type: if rng.random_range(0..2) == 0 {
                    "image".to_string()
                } else {
                    "video".to_string()
                },
                impressions: rng.random_range(10_000..=50_000),
                clicks: rng.random_range(300..=2_000),
                ctr: round2(rng.random_range(2.5..5.0)),
                age_days: rng.random_range(1..=30),
            })
            .collect();

        let underperformers = (0..total_creatives.min(2))
            .map(|i| CreativeAsset {
                asset_id: format!("asset_{}", i + 10),
                asset_type: if rng.random_range(0..2) == 0 {
                    "image".to_string()
                } else {
                    "video".to_string()
                },
                impressions: rng.random_range(5_000..=15_000),
                clicks: rng.random_range(50..=300),
                ctr: round2(rng.random_range(0.5..1.5)),
                age_days: rng.random_range(20..=60),
            })
            .collect();

        let fatigued = fatigue_detected(avg_age, frequency, ctr_trend);
        let refresh_reasoning = if fatigued {
            let mut reasons = Vec::new();
            if avg_age > 30 {
                reasons.push(format!("creatives aging (avg {avg_age} days)"));
            }
            if frequency > 6.0 {
                reasons.push(format!("high frequency ({frequency:.1})"));
            }
            if ctr_trend == CreativeTrend::Declining {
                reasons.push("declining CTR trend".to_string());
            }
            format!("Creative fatigue detected: {}", reasons.join(", "))
        } else {
            "Creatives performing well, no refresh needed".to_string()
        };

        CreativeMetrics {
            campaign_id: campaign_id.to_string(),
            total_creatives,
            avg_creative_age_days: avg_age,
            avg_ctr: round2(avg_ctr),
            ctr_trend,
            frequency,
            engagement_rate: round2(engagement_rate),
            engagement_trend,
            top_performers,
            underperformers,
            fatigue_detected: fatigued,
            refresh_recommended: fatigued,
            refresh_reasoning,
            collected_at: Utc::now(),
        }
    }
}

impl Default for CreativeMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collect for CreativeMetricsCollector {
    type Output = CreativeMetrics;

    async fn collect(&self, campaign_id: &str) -> Result<CreativeMetrics, CollectorError> {
        if let Some(cached) = self.cache.get(campaign_id) {
            return Ok(cached);
        }

        let metrics = Self::mock_metrics(campaign_id);
        self.cache.put(campaign_id, metrics.clone());
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatigue_age_boundary() {
        // Age alone: 30 is healthy, 31 is fatigued
        assert!(!fatigue_detected(30, 3.0, CreativeTrend::Stable));
        assert!(fatigue_detected(31, 3.0, CreativeTrend::Stable));
    }

    #[test]
    fn test_fatigue_frequency_boundary() {
        assert!(!fatigue_detected(10, 6.0, CreativeTrend::Stable));
        assert!(fatigue_detected(10, 6.1, CreativeTrend::Stable));
    }

    #[test]
    fn test_fatigue_declining_trend_alone() {
        assert!(fatigue_detected(5, 2.0, CreativeTrend::Declining));
        assert!(!fatigue_detected(5, 2.0, CreativeTrend::Improving));
    }

    #[tokio::test]
    async fn test_mock_metrics_consistent_with_predicate() {
        let collector = CreativeMetricsCollector::new();
        let metrics = collector.collect("camp_1234").await.unwrap();
        assert_eq!(
            metrics.fatigue_detected,
            fatigue_detected(
                metrics.avg_creative_age_days,
                metrics.frequency,
                metrics.ctr_trend
            )
        );
        assert_eq!(metrics.fatigue_detected, metrics.refresh_recommended);
        assert!(!metrics.refresh_reasoning.is_empty());
    }
}
