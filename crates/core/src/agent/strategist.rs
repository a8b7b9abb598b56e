//! # Strategist Stage
//!
//! Turns a signal analysis into a structured, actionable recommendation.
//! Re-invoked by the orchestrator when the critic finds critical issues.

use crate::llm::LanguageModel;
use crate::models::{AlternativeAction, Recommendation, WorkflowType};

use super::{extract, prompts, StageError};

const DEFAULT_CONFIDENCE: f64 = 0.75;

pub struct Strategist;

impl Strategist {
    pub const STAGE: &'static str = "recommendation";

    /// Run the recommendation stage: one generation, no retry.
    pub async fn run(
        llm: &dyn LanguageModel,
        analysis_text: &str,
        model_version: Option<&str>,
    ) -> Result<(String, Recommendation), StageError> {
        let raw = llm
            .invoke(prompts::STRATEGIST, analysis_text)
            .await
            .map_err(|source| StageError {
                stage: Self::STAGE,
                source,
            })?;

        let recommendation = Self::parse(&raw, analysis_text, model_version);
        Ok((raw, recommendation))
    }

    /// Derive the structured recommendation from raw model text
    pub fn parse(
        text: &str,
        analysis_text: &str,
        model_version: Option<&str>,
    ) -> Recommendation {
        Recommendation {
            recommended_workflow: extract::workflow(text),
            reasoning: extract::section(text, "Reasoning"),
            specific_actions: extract::section(text, "Specific Actions"),
            expected_impact: extract::section(text, "Expected Impact"),
            risk_level: extract::risk_level(text),
            confidence: extract::confidence(text).unwrap_or(DEFAULT_CONFIDENCE),
            timeline: extract::section(text, "Timeline"),
            success_criteria: extract::section(text, "Success Criteria"),
            alternatives: Self::parse_alternatives(text),
            signal_analysis: analysis_text.to_string(),
            model_version: model_version.map(str::to_string),
        }
    }

    /// Parse "- Alternative N: [Workflow] - Why not chosen: [Reason]" bullets.
    /// Bullets without a recognizable workflow name are skipped.
    fn parse_alternatives(text: &str) -> Vec<AlternativeAction> {
        extract::bullets_under(text, "Alternative Actions")
            .into_iter()
            .filter_map(|bullet| {
                let lower = bullet.to_lowercase();
                let workflow = WorkflowType::ALL
                    .into_iter()
                    .find(|w| lower.contains(&w.label().to_lowercase()))?;
                let why_not = lower
                    .find("why not chosen:")
                    .map(|idx| bullet[idx + "why not chosen:".len()..].trim().to_string())
                    .unwrap_or_else(|| bullet.clone());
                Some(AlternativeAction {
                    workflow,
                    why_not_recommended: why_not,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    const SAMPLE: &str = "\
**Recommended Workflow:** Creative Refresh\n\n\
**Reasoning:** Fatigue is suppressing CTR\n\n\
**Specific Actions:** Launch 3 new video variants this week\n\n\
**Expected Impact:** CTR back above 2.5% within 10 days\n\n\
**Risk Level:** medium\n\n\
**Confidence:** 0.8\n\n\
**Timeline:** 10-14 days\n\n\
**Success Criteria:** CTR recovers and CPA drops below $45\n\n\
**Alternative Actions:**\n\
- Alternative 1: Bid Adjustment - Why not chosen: does not address fatigue\n\
- Alternative 2: Campaign Pause - Why not chosen: too disruptive mid-flight\n";

    #[test]
    fn test_parse_recommendation() {
        let rec = Strategist::parse(SAMPLE, "analysis text", Some("gpt-4o"));
        assert_eq!(rec.recommended_workflow, WorkflowType::CreativeRefresh);
        assert_eq!(rec.risk_level, RiskLevel::Medium);
        assert_eq!(rec.confidence, 0.8);
        assert_eq!(rec.signal_analysis, "analysis text");
        assert_eq!(rec.model_version.as_deref(), Some("gpt-4o"));
        assert_eq!(rec.timeline, "10-14 days");
    }

    #[test]
    fn test_parse_alternatives() {
        let rec = Strategist::parse(SAMPLE, "", None);
        assert_eq!(rec.alternatives.len(), 2);
        assert_eq!(rec.alternatives[0].workflow, WorkflowType::BidAdjustment);
        assert_eq!(
            rec.alternatives[0].why_not_recommended,
            "does not address fatigue"
        );
        assert_eq!(rec.alternatives[1].workflow, WorkflowType::CampaignPause);
    }

    #[test]
    fn test_parse_defaults_on_unstructured_text() {
        let rec = Strategist::parse("the model rambled", "", None);
        assert_eq!(rec.recommended_workflow, WorkflowType::ContinueMonitoring);
        assert_eq!(rec.risk_level, RiskLevel::Low);
        assert!(rec.alternatives.is_empty());
    }
}
