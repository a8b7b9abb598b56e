//! # Critic Stage
//!
//! Reviews a recommendation and decides accept or regenerate. The
//! severity-tiered issue lists drive the orchestrator's loop: any
//! critical issue forces regeneration.

use crate::llm::LanguageModel;
use crate::models::CritiqueResult;

use super::{extract, prompts, StageError};

pub struct Critic;

impl Critic {
    pub const STAGE: &'static str = "critique";

    /// Run the critique stage: one generation, no retry.
    pub async fn run(
        llm: &dyn LanguageModel,
        recommendation_text: &str,
    ) -> Result<(String, CritiqueResult), StageError> {
        let raw = llm
            .invoke(prompts::CRITIC, recommendation_text)
            .await
            .map_err(|source| StageError {
                stage: Self::STAGE,
                source,
            })?;

        let critique = Self::parse(&raw);
        Ok((raw, critique))
    }

    /// Derive the structured critique from raw model text
    pub fn parse(text: &str) -> CritiqueResult {
        CritiqueResult {
            is_satisfactory: extract::satisfaction(text),
            critical_issues: extract::tagged_bullets(text, "CRITICAL"),
            major_issues: extract::tagged_bullets(text, "major"),
            minor_issues: extract::tagged_bullets(text, "minor"),
            strengths: extract::bullets_under(text, "Strengths"),
            suggestions: extract::bullets_under(text, "Suggestions"),
            overall_assessment: extract::section(text, "Overall Assessment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unsatisfactory_critique() {
        let text = "\
**Is Satisfactory:** no\n\n\
**Issues Found:**\n\
- CRITICAL: No budget impact analysis\n\
- major: Timeline is vague\n\
- minor: Typo in success criteria\n\n\
**Strengths:**\n\
- Root cause clearly linked to action\n\n\
**Suggestions for Improvement:**\n\
- Quantify the expected CPA change\n\n\
**Overall Assessment:** Needs another pass\n";

        let critique = Critic::parse(text);
        assert!(!critique.is_satisfactory);
        assert_eq!(critique.critical_issues, vec!["No budget impact analysis"]);
        assert_eq!(critique.major_issues, vec!["Timeline is vague"]);
        assert_eq!(critique.minor_issues, vec!["Typo in success criteria"]);
        assert_eq!(critique.strengths.len(), 1);
        assert_eq!(critique.suggestions.len(), 1);
        assert_eq!(critique.overall_assessment, "Needs another pass");
    }

    #[test]
    fn test_parse_satisfactory_critique() {
        let text = "\
**Is Satisfactory:** yes\n\n\
**Strengths:**\n\
- Specific and measurable\n\n\
**Overall Assessment:** Ready to ship\n";

        let critique = Critic::parse(text);
        assert!(critique.is_satisfactory);
        assert!(critique.critical_issues.is_empty());
    }

    #[test]
    fn test_parse_failure_leans_accept() {
        // No satisfaction marker and no critical issues: the transition
        // rules map this to finalize, never an infinite loop
        let critique = Critic::parse("garbled output");
        assert!(!critique.is_satisfactory);
        assert!(critique.critical_issues.is_empty());
    }
}
