//! # Signal Analyst Stage
//!
//! One model invocation over the rendered telemetry brief, producing a
//! narrative analysis plus its structured form.

use crate::llm::LanguageModel;
use crate::models::SignalAnalysis;

use super::{extract, prompts, StageError};

/// Default confidence when the analysis omits a parseable score
const DEFAULT_CONFIDENCE: f64 = 0.75;

pub struct SignalAnalyst;

impl SignalAnalyst {
    pub const STAGE: &'static str = "signal_analysis";

    /// Run the analysis stage: one generation, no retry.
    pub async fn run(
        llm: &dyn LanguageModel,
        context_text: &str,
    ) -> Result<(String, SignalAnalysis), StageError> {
        let raw = llm
            .invoke(prompts::SIGNAL_ANALYST, context_text)
            .await
            .map_err(|source| StageError {
                stage: Self::STAGE,
                source,
            })?;

        let analysis = Self::parse(&raw);
        Ok((raw, analysis))
    }

    /// Derive the structured analysis from raw model text
    pub fn parse(text: &str) -> SignalAnalysis {
        SignalAnalysis {
            key_signals: extract::section(text, "Key Signals"),
            signal_correlation: extract::section(text, "Signal Correlation"),
            root_cause: extract::section(text, "Root Cause"),
            confidence: extract::confidence(text).unwrap_or(DEFAULT_CONFIDENCE),
            supporting_evidence: extract::section(text, "Supporting Evidence"),
            alternate_hypotheses: extract::section(text, "Alternate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::extract::NOT_SPECIFIED;

    #[test]
    fn test_parse_full_analysis() {
        let text = "\
**Key Signals:** CPA up 42%, CTR down 18%\n\n\
**Signal Correlation:** Rising frequency with falling engagement\n\n\
**Root Cause:** Creative fatigue\n\n\
**Confidence:** 0.85\n\n\
**Supporting Evidence:** Frequency at 6.8 impressions/user\n\n\
**Alternate Hypotheses:** Seasonal dip in demand\n";

        let analysis = SignalAnalyst::parse(text);
        assert_eq!(analysis.key_signals, "CPA up 42%, CTR down 18%");
        assert_eq!(analysis.root_cause, "Creative fatigue");
        assert_eq!(analysis.confidence, 0.85);
        assert_eq!(analysis.alternate_hypotheses, "Seasonal dip in demand");
    }

    #[test]
    fn test_parse_sparse_analysis_uses_sentinels() {
        let analysis = SignalAnalyst::parse("nothing structured here");
        assert_eq!(analysis.key_signals, NOT_SPECIFIED);
        assert_eq!(analysis.root_cause, NOT_SPECIFIED);
        assert_eq!(analysis.confidence, 0.75);
    }
}
