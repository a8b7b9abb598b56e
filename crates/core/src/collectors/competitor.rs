//! # Competitor Signals Collector
//!
//! Competitive-intelligence indicators for one campaign's market.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{round1, Collect, CollectorError, TtlCache};

/// Three-level competitive pressure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
}

impl PressureLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PressureLevel::Low => "low",
            PressureLevel::Medium => "medium",
            PressureLevel::High => "high",
        }
    }
}

/// Individual competitor activity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorActivity {
    pub competitor_name: String,
    pub market_share_pct: f64,
    pub activity_change_pct: f64,
    pub estimated_spend_change_pct: f64,
}

/// Competitor activity indicators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorSignals {
    pub campaign_id: String,

    // Overall market dynamics
    pub total_competitors: u32,
    pub new_entrants_last_week: u32,
    pub market_activity_change_pct: f64,

    // Competitive pressure inputs
    /// 0-100 auction intensity score
    pub auction_competition_score: f64,
    pub avg_competitor_bid_change_pct: f64,
    pub impression_share_lost_pct: f64,

    pub top_competitors: Vec<CompetitorActivity>,

    // Derived assessment
    pub competitive_pressure: PressureLevel,
    pub pressure_reasoning: String,

    pub collected_at: DateTime<Utc>,
}

/// Weighted pressure score on a 100-point scale: auction intensity 40%,
/// market activity magnitude 30%, bid-change magnitude 30%. Monotonic in
/// the auction score.
pub fn pressure_score(
    auction_score: f64,
    market_activity_change_pct: f64,
    bid_change_pct: f64,
) -> f64 {
    auction_score / 100.0 * 40.0
        + market_activity_change_pct.abs().min(50.0) / 50.0 * 30.0
        + bid_change_pct.abs().min(40.0) / 40.0 * 30.0
}

/// Classification thresholds: above 70 high, above 40 medium, else low
pub fn classify_pressure(score: f64) -> PressureLevel {
    if score > 70.0 {
        PressureLevel::High
    } else if score > 40.0 {
        PressureLevel::Medium
    } else {
        PressureLevel::Low
    }
}

/// Collects competitor intelligence.
///
/// Stub implementation returning mock data; production would integrate
/// third-party competitive-intelligence providers.
pub struct CompetitorSignalsCollector {
    cache: TtlCache<CompetitorSignals>,
}

impl CompetitorSignalsCollector {
    pub fn new() -> Self {
        Self {
            cache: TtlCache::default(),
        }
    }

    fn mock_metrics(campaign_id: &str) -> CompetitorSignals {
        let mut rng = rand::rng();

        let total_competitors: u32 = rng.random_range(5..=15);
        let new_entrants: u32 = rng.random_range(0..=4);
        let market_activity_change = round1(rng.random_range(-20.0..60.0));
        let auction_score = round1(rng.random_range(30.0..95.0));
        let bid_change = round1(rng.random_range(-15.0..40.0));
        let impression_share_lost = round1(rng.random_range(5.0..35.0));

        let top_competitors = (0..total_competitors.min(5))
            .map(|i| CompetitorActivity {
                competitor_name: format!("Competitor {}", (b'A' + i as u8) as char),
                market_share_pct: round1(rng.random_range(10.0..30.0)),
                activity_change_pct: round1(rng.random_range(-10.0..50.0)),
                estimated_spend_change_pct: round1(rng.random_range(-5.0..45.0)),
            })
            .collect();

        let score = pressure_score(auction_score, market_activity_change, bid_change);
        let pressure = classify_pressure(score);
        let pressure_reasoning = match pressure {
            PressureLevel::High => format!(
                "High competitive pressure: auction competition score {auction_score:.0}/100, \
                 market activity up {market_activity_change:.1}%, avg bid increase {bid_change:.1}%"
            ),
            PressureLevel::Medium => format!(
                "Moderate competitive pressure: auction score {auction_score:.0}/100, \
                 {new_entrants} new entrants, market activity change {market_activity_change:.1}%"
            ),
            PressureLevel::Low => format!(
                "Low competitive pressure: stable auction environment, \
                 market activity change {market_activity_change:.1}%"
            ),
        };

        CompetitorSignals {
            campaign_id: campaign_id.to_string(),
            total_competitors,
            new_entrants_last_week: new_entrants,
            market_activity_change_pct: market_activity_change,
            auction_competition_score: auction_score,
            avg_competitor_bid_change_pct: bid_change,
            impression_share_lost_pct: impression_share_lost,
            top_competitors,
            competitive_pressure: pressure,
            pressure_reasoning,
            collected_at: Utc::now(),
        }
    }
}

impl Default for CompetitorSignalsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collect for CompetitorSignalsCollector {
    type Output = CompetitorSignals;

    async fn collect(&self, campaign_id: &str) -> Result<CompetitorSignals, CollectorError> {
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
    fn test_pressure_score_monotonic_in_auction_score() {
        let mut last = f64::MIN;
        for auction in 0..=100 {
            let score = pressure_score(auction as f64, 25.0, 10.0);
            assert!(score >= last, "score decreased at auction={auction}");
            last = score;
        }
    }

    #[test]
    fn test_pressure_classification_thresholds() {
        assert_eq!(classify_pressure(40.0), PressureLevel::Low);
        assert_eq!(classify_pressure(40.1), PressureLevel::Medium);
        assert_eq!(classify_pressure(70.0), PressureLevel::Medium);
        assert_eq!(classify_pressure(70.1), PressureLevel::High);
    }

    #[test]
    fn test_pressure_score_weights() {
        // All inputs at their caps saturate the 100-point scale
        assert_eq!(pressure_score(100.0, 50.0, 40.0), 100.0);
        // Magnitudes beyond the caps do not push the score higher
        assert_eq!(pressure_score(100.0, 500.0, 400.0), 100.0);
        assert_eq!(pressure_score(0.0, 0.0, 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_mock_signals_consistent_with_classification() {
        let collector = CompetitorSignalsCollector::new();
        let signals = collector.collect("camp_1234").await.unwrap();
        let score = pressure_score(
            signals.auction_competition_score,
            signals.market_activity_change_pct,
            signals.avg_competitor_bid_change_pct,
        );
        assert_eq!(signals.competitive_pressure, classify_pressure(score));
        assert!(signals.auction_competition_score <= 100.0);
        assert!(!signals.top_competitors.is_empty());
    }
}
