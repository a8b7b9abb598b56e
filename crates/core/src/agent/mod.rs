//! # Reasoning Agent
//!
//! The multi-stage reasoning pipeline for campaign analysis.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Campaign ID → Context Aggregator → Signal Analyst → Strategist ⟷ Critic → Finalize
//! ```
//!
//! The Critic gates a bounded regeneration loop: a critique with critical
//! issues sends the pipeline back to the Strategist until `max_iterations`
//! is exhausted.

use thiserror::Error;

use crate::llm::LlmError;

pub mod analyst;
pub mod critic;
pub mod events;
pub mod extract;
pub mod prompts;
pub mod strategist;
pub mod workflow;

pub use analyst::SignalAnalyst;
pub use critic::Critic;
pub use events::{AgentEvent, AgentEventKind};
pub use strategist::Strategist;
pub use workflow::{
    should_regenerate, AgentConfig, AnalysisReport, CampaignAgent, PipelineState, Workflow,
    WorkflowStage,
};

/// A single stage's generation failed.
///
/// Extraction never fails (missing fields resolve to sentinels), so the
/// only way a stage errors is the underlying text-generation call.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: &'static str,
    #[source]
    pub source: LlmError,
}
