//! # Context Aggregator
//!
//! Fans out to the three collectors concurrently, fails fast on any
//! sub-collector error, and renders the bundle as a deterministic
//! textual brief for model consumption. Downstream stages never see a
//! partially-populated context.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::campaign::{CampaignMetrics, CampaignMetricsCollector};
use super::competitor::{CompetitorSignals, CompetitorSignalsCollector};
use super::creative::{CreativeAsset, CreativeMetrics, CreativeMetricsCollector};
use super::{Collect, CollectorError};

/// Complete, immutable context for one campaign analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContext {
    pub campaign_id: String,
    pub campaign_metrics: CampaignMetrics,
    pub creative_metrics: CreativeMetrics,
    pub competitor_signals: CompetitorSignals,
    pub collected_at: chrono::DateTime<Utc>,
    pub collection_time_ms: u64,
}

/// Orchestrates parallel collection from all three telemetry sources.
///
/// Generic over its collectors so tests can inject failing or counting
/// doubles; defaults to the bundled mock collectors.
pub struct ContextBuilder<
    CA = CampaignMetricsCollector,
    CR = CreativeMetricsCollector,
    CO = CompetitorSignalsCollector,
> {
    campaign: CA,
    creative: CR,
    competitor: CO,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            campaign: CampaignMetricsCollector::new(),
            creative: CreativeMetricsCollector::new(),
            competitor: CompetitorSignalsCollector::new(),
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<CA, CR, CO> ContextBuilder<CA, CR, CO>
where
    CA: Collect<Output = CampaignMetrics>,
    CR: Collect<Output = CreativeMetrics>,
    CO: Collect<Output = CompetitorSignals>,
{
    pub fn with_collectors(campaign: CA, creative: CR, competitor: CO) -> Self {
        Self {
            campaign,
            creative,
            competitor,
        }
    }

    /// Collect all campaign context in parallel.
    ///
    /// Waits for all three collectors to settle, then inspects each
    /// branch: any failure aborts the build with the failing collector
    /// named in the error, so siblings are never silently dropped.
    pub async fn build(&self, campaign_id: &str) -> Result<CampaignContext, CollectorError> {
        let started = Instant::now();

        let (campaign, creative, competitor) = tokio::join!(
            self.campaign.collect(campaign_id),
            self.creative.collect(campaign_id),
            self.competitor.collect(campaign_id),
        );

        let campaign_metrics = campaign?;
        let creative_metrics = creative?;
        let competitor_signals = competitor?;

        Ok(CampaignContext {
            campaign_id: campaign_id.to_string(),
            campaign_metrics,
            creative_metrics,
            competitor_signals,
            collected_at: Utc::now(),
            collection_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Render the context as a readable brief for LLM consumption.
    ///
    /// Pure: the same context always yields byte-identical text. This is
    /// the only channel through which the reasoning stages observe
    /// telemetry.
    pub fn render(&self, context: &CampaignContext) -> String {
        let cm = &context.campaign_metrics;
        let cr = &context.creative_metrics;
        let comp = &context.competitor_signals;

        format!(
            "## Campaign Overview\n\
             - Campaign: {name} (ID: {id})\n\
             - Platform: {platform}\n\
             - Period: {start} to {end} ({days} days)\n\
             - Budget: ${budget:.2} (${spend:.2} spent, {util:.1}% utilized)\n\
             \n\
             ## Performance Metrics\n\
             ### Current Period\n\
             - Impressions: {impressions}\n\
             - Clicks: {clicks} (CTR: {ctr:.2}%)\n\
             - Conversions: {conversions} (CVR: {cvr:.2}%)\n\
             - Spend: ${spend:.2}\n\
             - CPA: ${cpa:.2}\n\
             - CPM: ${cpm:.2}\n\
             \n\
             ### Changes vs. Previous Period\n\
             - CPA: {cpa_chg:+.1}%\n\
             - CTR: {ctr_chg:+.1}%\n\
             - CVR: {cvr_chg:+.1}%\n\
             - Spend: {spend_chg:+.1}%\n\
             \n\
             ## Creative Performance\n\
             - Total Creatives: {total_creatives}\n\
             - Average Creative Age: {avg_age} days\n\
             - Average CTR: {avg_ctr:.2}%\n\
             - CTR Trend: {ctr_trend}\n\
             - Frequency: {frequency:.1} impressions/user\n\
             - Engagement Rate: {engagement:.2}%\n\
             - Engagement Trend: {engagement_trend}\n\
             - Fatigue Detected: {fatigue}\n\
             - Refresh Recommended: {refresh}\n\
             - Reasoning: {refresh_reasoning}\n\
             \n\
             ### Top Performing Assets\n\
             {top_assets}\n\
             \n\
             ### Underperforming Assets\n\
             {under_assets}\n\
             \n\
             ## Competitive Landscape\n\
             - Total Competitors: {competitors}\n\
             - New Entrants (last 7 days): {entrants}\n\
             - Market Activity Change: {market_chg:+.1}%\n\
             - Auction Competition Score: {auction:.1}/100\n\
             - Avg Competitor Bid Change: {bid_chg:+.1}%\n\
             - Impression Share Lost to Competitors: {share_lost:.1}%\n\
             - Competitive Pressure: {pressure}\n\
             - Assessment: {pressure_reasoning}\n\
             \n\
             ### Top Competitors\n\
             {top_competitors}",
            name = cm.campaign_name,
            id = cm.campaign_id,
            platform = cm.platform,
            start = cm.period_start.format("%Y-%m-%d"),
            end = cm.period_end.format("%Y-%m-%d"),
            days = cm.days_running,
            budget = cm.budget,
            spend = cm.spend,
            util = cm.budget_utilization_pct,
            impressions = group_thousands(cm.impressions),
            clicks = group_thousands(cm.clicks),
            ctr = cm.ctr,
            conversions = group_thousands(cm.conversions),
            cvr = cm.cvr,
            cpa = cm.cpa,
            cpm = cm.cpm,
            cpa_chg = cm.cpa_change_pct,
            ctr_chg = cm.ctr_change_pct,
            cvr_chg = cm.cvr_change_pct,
            spend_chg = cm.spend_change_pct,
            total_creatives = cr.total_creatives,
            avg_age = cr.avg_creative_age_days,
            avg_ctr = cr.avg_ctr,
            ctr_trend = cr.ctr_trend.as_str(),
            frequency = cr.frequency,
            engagement = cr.engagement_rate,
            engagement_trend = cr.engagement_trend.as_str(),
            fatigue = cr.fatigue_detected,
            refresh = cr.refresh_recommended,
            refresh_reasoning = cr.refresh_reasoning,
            top_assets = format_assets(&cr.top_performers),
            under_assets = format_assets(&cr.underperformers),
            competitors = comp.total_competitors,
            entrants = comp.new_entrants_last_week,
            market_chg = comp.market_activity_change_pct,
            auction = comp.auction_competition_score,
            bid_chg = comp.avg_competitor_bid_change_pct,
            share_lost = comp.impression_share_lost_pct,
            pressure = comp.competitive_pressure.as_str().to_uppercase(),
            pressure_reasoning = comp.pressure_reasoning,
            top_competitors = format_competitors(&comp.top_competitors),
        )
    }
}

fn format_assets(assets: &[CreativeAsset]) -> String {
    if assets.is_empty() {
        return "  None".to_string();
    }
    assets
        .iter()
        .map(|asset| {
            format!(
                "  - {} ({}): {} impressions, CTR {:.2}%, {} days old",
                asset.asset_id,
                asset.asset_type,
                group_thousands(asset.impressions),
                asset.ctr,
                asset.age_days
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_competitors(competitors: &[super::competitor::CompetitorActivity]) -> String {
    if competitors.is_empty() {
        return "  None".to_string();
    }
    competitors
        .iter()
        .map(|comp| {
            format!(
                "  - {}: {:.1}% market share, activity {:+.1}%, spend {:+.1}%",
                comp.competitor_name,
                comp.market_share_pct,
                comp.activity_change_pct,
                comp.estimated_spend_change_pct
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingCreativeCollector;

    #[async_trait]
    impl Collect for FailingCreativeCollector {
        type Output = CreativeMetrics;

        async fn collect(&self, _campaign_id: &str) -> Result<CreativeMetrics, CollectorError> {
            Err(CollectorError::new("creative_metrics", "upstream unavailable"))
        }
    }

    struct CountingCampaignCollector {
        inner: CampaignMetricsCollector,
        calls: std::sync::Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Collect for CountingCampaignCollector {
        type Output = CampaignMetrics;

        async fn collect(&self, campaign_id: &str) -> Result<CampaignMetrics, CollectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.collect(campaign_id).await
        }
    }

    #[tokio::test]
    async fn test_build_returns_all_three_records() {
        let builder = ContextBuilder::new();
        let context = builder.build("camp_1234").await.unwrap();
        assert_eq!(context.campaign_id, "camp_1234");
        assert_eq!(context.campaign_metrics.campaign_id, "camp_1234");
        assert_eq!(context.creative_metrics.campaign_id, "camp_1234");
        assert_eq!(context.competitor_signals.campaign_id, "camp_1234");
    }

    #[tokio::test]
    async fn test_build_fails_fast_naming_collector() {
        let builder = ContextBuilder::with_collectors(
            CampaignMetricsCollector::new(),
            FailingCreativeCollector,
            CompetitorSignalsCollector::new(),
        );
        let err = builder.build("camp_1234").await.unwrap_err();
        assert_eq!(err.collector, "creative_metrics");
    }

    #[tokio::test]
    async fn test_render_is_pure() {
        let builder = ContextBuilder::new();
        let context = builder.build("camp_1234").await.unwrap();
        let first = builder.render(&context);
        let second = builder.render(&context);
        assert_eq!(first, second);
        assert!(first.contains("## Campaign Overview"));
        assert!(first.contains("## Competitive Landscape"));
    }

    #[tokio::test]
    async fn test_second_build_hits_collector_cache() {
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counting = CountingCampaignCollector {
            inner: CampaignMetricsCollector::new(),
            calls: calls.clone(),
        };
        let builder = ContextBuilder::with_collectors(
            counting,
            CreativeMetricsCollector::new(),
            CompetitorSignalsCollector::new(),
        );

        let first = builder.build("camp_1234").await.unwrap();
        let second = builder.build("camp_1234").await.unwrap();
        // The wrapper is invoked twice but the inner cache short-circuits,
        // so both builds carry identical telemetry
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            first.campaign_metrics.impressions,
            second.campaign_metrics.impressions
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
