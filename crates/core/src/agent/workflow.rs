//! # Pipeline Orchestrator
//!
//! Sequences the reasoning stages over one campaign and drives the
//! critique-gated regeneration loop. A single run executes strictly
//! sequentially; only the context collectors inside the aggregator run
//! concurrently. The loop is bounded: the critic can send the pipeline
//! back to the strategist at most `max_iterations` times.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::collectors::{
    CampaignContext, CampaignMetrics, CampaignMetricsCollector, Collect, CompetitorSignals,
    CompetitorSignalsCollector, ContextBuilder, CreativeMetrics, CreativeMetricsCollector,
};
use crate::llm::LanguageModel;
use crate::models::{ChatMessage, CritiqueResult, Recommendation, SignalAnalysis};

use super::analyst::SignalAnalyst;
use super::critic::Critic;
use super::events::{AgentEvent, AgentEventKind};
use super::prompts;
use super::strategist::Strategist;

/// Stage of the reasoning pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Parallel telemetry collection
    CollectContext,
    /// Root-cause analysis over the rendered brief
    AnalyzeSignals,
    /// Recommendation generation
    GenerateRecommendation,
    /// Critic review gating the regeneration loop
    Critique,
    /// Completion metadata stamping
    Finalize,
    /// Terminal
    Done,
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Current stage
    pub stage: WorkflowStage,
    /// Number of critic-forced regenerations so far
    pub iterations: u32,
    /// Maximum regenerations before forced finalization
    pub max_iterations: u32,
}

impl Workflow {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            stage: WorkflowStage::CollectContext,
            iterations: 0,
            max_iterations,
        }
    }

    /// Advance to the next stage in the linear order
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            WorkflowStage::CollectContext => WorkflowStage::AnalyzeSignals,
            WorkflowStage::AnalyzeSignals => WorkflowStage::GenerateRecommendation,
            WorkflowStage::GenerateRecommendation => WorkflowStage::Critique,
            WorkflowStage::Critique => WorkflowStage::Finalize,
            WorkflowStage::Finalize => WorkflowStage::Done,
            WorkflowStage::Done => WorkflowStage::Done,
        };
    }

    /// Loop back to the strategist, consuming one iteration
    pub fn regenerate(&mut self) {
        self.iterations += 1;
        self.stage = WorkflowStage::GenerateRecommendation;
    }

    /// Short-circuit the remaining reasoning stages
    pub fn abort(&mut self) {
        self.stage = WorkflowStage::Finalize;
    }

    pub fn is_done(&self) -> bool {
        self.stage == WorkflowStage::Done
    }
}

/// Regeneration decision: loop back iff the critique succeeded, declared
/// itself unsatisfied, carries at least one critical issue, and the
/// iteration budget is not exhausted.
pub fn should_regenerate(
    critique: Option<&CritiqueResult>,
    iterations: u32,
    max_iterations: u32,
) -> bool {
    if iterations >= max_iterations {
        return false;
    }
    match critique {
        Some(critique) => !critique.is_satisfactory && !critique.critical_issues.is_empty(),
        None => false,
    }
}

/// Working memory threaded through one pipeline run.
///
/// Created fresh per run, extended (never destructively overwritten) by
/// each stage, and discarded once the report is assembled. Owned
/// exclusively by the orchestrator for the duration of the run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    pub campaign_id: String,
    pub context: Option<CampaignContext>,
    pub context_text: String,
    /// Accumulated message transcript across all stages
    pub messages: Vec<ChatMessage>,
    pub signal_analysis: Option<SignalAnalysis>,
    pub signal_analysis_text: String,
    pub recommendation: Option<Recommendation>,
    pub recommendation_text: String,
    pub critique: Option<CritiqueResult>,
    pub iteration_count: u32,
    pub errors: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PipelineState {
    fn new(campaign_id: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("started_at".to_string(), json!(Utc::now().to_rfc3339()));
        Self {
            campaign_id: campaign_id.to_string(),
            context: None,
            context_text: String::new(),
            messages: Vec::new(),
            signal_analysis: None,
            signal_analysis_text: String::new(),
            recommendation: None,
            recommendation_text: String::new(),
            critique: None,
            iteration_count: 0,
            errors: Vec::new(),
            metadata,
        }
    }
}

/// Configuration for the campaign agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum critic-forced regenerations
    pub max_iterations: u32,
    /// Overall time budget for one run; expiry cancels in-flight work
    pub timeout_secs: u64,
    /// Model name stamped onto generated recommendations
    pub model_version: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            timeout_secs: 60,
            model_version: None,
        }
    }
}

/// Final output of one pipeline run.
///
/// Exposes the last-known recommendation, analysis, critique, context and
/// accumulated error list however termination was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub campaign_id: String,
    pub recommendation: Option<Recommendation>,
    pub signal_analysis: Option<SignalAnalysis>,
    pub critique: Option<CritiqueResult>,
    pub context: Option<CampaignContext>,
    pub iterations: u32,
    pub errors: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub events: Vec<AgentEvent>,
}

/// The campaign reasoning agent.
///
/// An explicit service object: construct once at process start and hand
/// it to request-handling code; no module-level mutable state. Generic
/// over the context collectors so tests can inject doubles.
pub struct CampaignAgent<
    CA = CampaignMetricsCollector,
    CR = CreativeMetricsCollector,
    CO = CompetitorSignalsCollector,
> {
    config: AgentConfig,
    context_builder: ContextBuilder<CA, CR, CO>,
    llm: Arc<dyn LanguageModel>,
    events: Vec<AgentEvent>,
    event_tx: Option<mpsc::Sender<AgentEvent>>,
}

impl CampaignAgent {
    /// Create an agent with the bundled mock collectors
    pub fn new(llm: Arc<dyn LanguageModel>, config: AgentConfig) -> Self {
        Self::with_context_builder(llm, config, ContextBuilder::new())
    }
}

impl<CA, CR, CO> CampaignAgent<CA, CR, CO>
where
    CA: Collect<Output = CampaignMetrics>,
    CR: Collect<Output = CreativeMetrics>,
    CO: Collect<Output = CompetitorSignals>,
{
    pub fn with_context_builder(
        llm: Arc<dyn LanguageModel>,
        config: AgentConfig,
        context_builder: ContextBuilder<CA, CR, CO>,
    ) -> Self {
        Self {
            config,
            context_builder,
            llm,
            events: Vec::new(),
            event_tx: None,
        }
    }

    /// Set event channel for streaming pipeline events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    async fn emit(&mut self, event: AgentEvent) {
        tracing::debug!(kind = ?event.kind, stage = ?event.stage, "pipeline event");
        self.events.push(event.clone());
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Analyze a campaign and produce a recommendation report.
    ///
    /// The run is bounded by the configured time budget; exceeding it
    /// abandons in-flight collector and generation calls and surfaces as
    /// cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn analyze(&mut self, campaign_id: &str) -> Result<AnalysisReport> {
        let budget = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(budget, self.run_pipeline(campaign_id)).await {
            Ok(report) => Ok(report),
            Err(_) => anyhow::bail!(
                "analysis of campaign {campaign_id} cancelled: {}s time budget exceeded",
                self.config.timeout_secs
            ),
        }
    }

    async fn run_pipeline(&mut self, campaign_id: &str) -> AnalysisReport {
        tracing::info!(campaign_id, "starting campaign analysis");
        self.events.clear();

        let mut state = PipelineState::new(campaign_id);
        let mut workflow = Workflow::new(self.config.max_iterations);

        self.emit(AgentEvent::new(
            AgentEventKind::RunStarted,
            WorkflowStage::CollectContext,
        ))
        .await;

        // Stage 1: collect context (parallel fan-out inside the builder)
        self.emit(AgentEvent::new(
            AgentEventKind::StageStarted,
            WorkflowStage::CollectContext,
        ))
        .await;

        match self.context_builder.build(campaign_id).await {
            Ok(context) => {
                state.context_text = self.context_builder.render(&context);
                state.metadata.insert(
                    "context_collection_ms".to_string(),
                    json!(context.collection_time_ms),
                );
                state.context = Some(context);
                self.emit(AgentEvent::new(
                    AgentEventKind::StageCompleted,
                    WorkflowStage::CollectContext,
                ))
                .await;
                workflow.advance();
            }
            Err(e) => {
                tracing::error!(error = %e, "context collection failed");
                state.errors.push(format!("Context collection failed: {e}"));
                self.emit(
                    AgentEvent::new(AgentEventKind::StageFailed, WorkflowStage::CollectContext)
                        .with_data(json!({ "error": e.to_string() })),
                )
                .await;
                workflow.abort();
            }
        }

        // Stage 2: signal analysis. Failure here is fatal to the run: a
        // recommendation with no grounding analysis is worse than none.
        if workflow.stage == WorkflowStage::AnalyzeSignals {
            self.emit(AgentEvent::new(
                AgentEventKind::StageStarted,
                WorkflowStage::AnalyzeSignals,
            ))
            .await;

            state.messages.push(ChatMessage::system(prompts::SIGNAL_ANALYST));
            state.messages.push(ChatMessage::user(&state.context_text));

            match SignalAnalyst::run(self.llm.as_ref(), &state.context_text).await {
                Ok((raw, analysis)) => {
                    state.messages.push(ChatMessage::assistant(&raw));
                    state.signal_analysis_text = raw;
                    state.signal_analysis = Some(analysis);
                    self.emit(AgentEvent::new(
                        AgentEventKind::StageCompleted,
                        WorkflowStage::AnalyzeSignals,
                    ))
                    .await;
                    workflow.advance();
                }
                Err(e) => {
                    tracing::error!(error = %e, "signal analysis failed");
                    state.errors.push(format!("Signal analysis failed: {e}"));
                    self.emit(
                        AgentEvent::new(AgentEventKind::StageFailed, WorkflowStage::AnalyzeSignals)
                            .with_data(json!({ "error": e.to_string() })),
                    )
                    .await;
                    workflow.abort();
                }
            }
        }

        // Stages 3-4: strategist ⟷ critic loop, bounded by max_iterations
        while workflow.stage == WorkflowStage::GenerateRecommendation {
            self.emit(
                AgentEvent::new(
                    AgentEventKind::StageStarted,
                    WorkflowStage::GenerateRecommendation,
                )
                .with_data(json!({ "iteration": workflow.iterations })),
            )
            .await;

            state.messages.push(ChatMessage::system(prompts::STRATEGIST));
            state.messages.push(ChatMessage::user(&state.signal_analysis_text));

            match Strategist::run(
                self.llm.as_ref(),
                &state.signal_analysis_text,
                self.config.model_version.as_deref(),
            )
            .await
            {
                Ok((raw, recommendation)) => {
                    state.messages.push(ChatMessage::assistant(&raw));
                    state.recommendation_text = raw;
                    state.recommendation = Some(recommendation);
                    self.emit(AgentEvent::new(
                        AgentEventKind::StageCompleted,
                        WorkflowStage::GenerateRecommendation,
                    ))
                    .await;
                    workflow.advance();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recommendation generation failed, finalizing with partial state");
                    state.errors.push(format!("Recommendation generation failed: {e}"));
                    self.emit(
                        AgentEvent::new(
                            AgentEventKind::StageFailed,
                            WorkflowStage::GenerateRecommendation,
                        )
                        .with_data(json!({ "error": e.to_string() })),
                    )
                    .await;
                    workflow.abort();
                    break;
                }
            }

            // Critic review. Failure is fail-open: treat as satisfactory
            // so the pipeline always terminates.
            self.emit(AgentEvent::new(
                AgentEventKind::StageStarted,
                WorkflowStage::Critique,
            ))
            .await;

            state.messages.push(ChatMessage::system(prompts::CRITIC));
            state.messages.push(ChatMessage::user(&state.recommendation_text));

            match Critic::run(self.llm.as_ref(), &state.recommendation_text).await {
                Ok((raw, critique)) => {
                    state.messages.push(ChatMessage::assistant(&raw));
                    state.critique = Some(critique);
                    self.emit(AgentEvent::new(
                        AgentEventKind::StageCompleted,
                        WorkflowStage::Critique,
                    ))
                    .await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "critique failed, accepting recommendation");
                    state.errors.push(format!("Critique failed: {e}"));
                    state.critique = Some(CritiqueResult::fail_open(
                        "Critique failed, accepting recommendation",
                    ));
                    self.emit(
                        AgentEvent::new(AgentEventKind::StageFailed, WorkflowStage::Critique)
                            .with_data(json!({ "error": e.to_string() })),
                    )
                    .await;
                }
            }

            if should_regenerate(
                state.critique.as_ref(),
                workflow.iterations,
                workflow.max_iterations,
            ) {
                let critical = state
                    .critique
                    .as_ref()
                    .map(|c| c.critical_issues.clone())
                    .unwrap_or_default();
                tracing::info!(?critical, iteration = workflow.iterations, "regenerating recommendation");
                self.emit(
                    AgentEvent::new(
                        AgentEventKind::RecommendationRejected,
                        WorkflowStage::Critique,
                    )
                    .with_data(json!({ "critical_issues": critical })),
                )
                .await;
                workflow.regenerate();
                state.iteration_count = workflow.iterations;
            } else {
                let wants_regen = state
                    .critique
                    .as_ref()
                    .map(|c| !c.is_satisfactory && !c.critical_issues.is_empty())
                    .unwrap_or(false);
                if wants_regen && workflow.iterations >= workflow.max_iterations {
                    tracing::warn!(
                        iterations = workflow.iterations,
                        "max iterations reached, finalizing with last recommendation"
                    );
                }
                workflow.advance();
            }
        }

        // Finalize: stamp completion metadata and expose whatever state
        // exists, however termination was reached.
        state
            .metadata
            .insert("completed_at".to_string(), json!(Utc::now().to_rfc3339()));
        state.metadata.insert(
            "total_iterations".to_string(),
            json!(state.iteration_count),
        );
        workflow.stage = WorkflowStage::Done;

        self.emit(
            AgentEvent::new(AgentEventKind::RunCompleted, WorkflowStage::Done).with_data(json!({
                "iterations": state.iteration_count,
                "errors": state.errors.len(),
            })),
        )
        .await;

        tracing::info!(
            campaign_id,
            iterations = state.iteration_count,
            errors = state.errors.len(),
            "campaign analysis finished"
        );

        AnalysisReport {
            campaign_id: state.campaign_id,
            recommendation: state.recommendation,
            signal_analysis: state.signal_analysis,
            critique: state.critique,
            context: state.context,
            iterations: state.iteration_count,
            errors: state.errors,
            metadata: state.metadata,
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::CollectorError;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ANALYST_REPLY: &str = "\
**Key Signals:** CPA up 40%\n\n**Root Cause:** Creative fatigue\n\n**Confidence:** 0.8\n";
    const STRATEGIST_REPLY: &str = "\
**Recommended Workflow:** Creative Refresh\n\n**Reasoning:** Fatigue is suppressing CTR\n\n\
**Risk Level:** low\n\n**Confidence:** 0.8\n";
    const CRITIC_REJECTS: &str = "\
**Is Satisfactory:** no\n\n**Issues Found:**\n- CRITICAL: No budget impact analysis\n";
    const CRITIC_ACCEPTS: &str = "\
**Is Satisfactory:** yes\n\n**Overall Assessment:** Solid recommendation\n";

    struct ScriptedModel {
        analyst_calls: AtomicUsize,
        strategist_calls: AtomicUsize,
        critic_calls: AtomicUsize,
        fail_analyst: bool,
        fail_critic: bool,
        critic_reply: &'static str,
    }

    impl ScriptedModel {
        fn new(critic_reply: &'static str) -> Self {
            Self {
                analyst_calls: AtomicUsize::new(0),
                strategist_calls: AtomicUsize::new(0),
                critic_calls: AtomicUsize::new(0),
                fail_analyst: false,
                fail_critic: false,
                critic_reply,
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn invoke(&self, system: &str, _user: &str) -> Result<String, LlmError> {
            if system == prompts::SIGNAL_ANALYST {
                self.analyst_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_analyst {
                    return Err(LlmError::Transport("analyst endpoint down".into()));
                }
                Ok(ANALYST_REPLY.to_string())
            } else if system == prompts::STRATEGIST {
                self.strategist_calls.fetch_add(1, Ordering::SeqCst);
                Ok(STRATEGIST_REPLY.to_string())
            } else if system == prompts::CRITIC {
                self.critic_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_critic {
                    return Err(LlmError::Transport("critic endpoint down".into()));
                }
                Ok(self.critic_reply.to_string())
            } else {
                Err(LlmError::EmptyResponse)
            }
        }
    }

    struct FailingCampaignCollector;

    #[async_trait]
    impl Collect for FailingCampaignCollector {
        type Output = CampaignMetrics;

        async fn collect(&self, _campaign_id: &str) -> Result<CampaignMetrics, CollectorError> {
            Err(CollectorError::new("campaign_metrics", "platform API 500"))
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn invoke(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(LlmError::EmptyResponse)
        }
    }

    fn config(max_iterations: u32) -> AgentConfig {
        AgentConfig {
            max_iterations,
            timeout_secs: 30,
            model_version: Some("test-model".to_string()),
        }
    }

    #[test]
    fn test_workflow_advance_order() {
        let mut workflow = Workflow::new(3);
        assert_eq!(workflow.stage, WorkflowStage::CollectContext);
        workflow.advance();
        assert_eq!(workflow.stage, WorkflowStage::AnalyzeSignals);
        workflow.advance();
        assert_eq!(workflow.stage, WorkflowStage::GenerateRecommendation);
        workflow.advance();
        assert_eq!(workflow.stage, WorkflowStage::Critique);
        workflow.advance();
        assert_eq!(workflow.stage, WorkflowStage::Finalize);
        workflow.advance();
        assert!(workflow.is_done());
    }

    #[test]
    fn test_workflow_regenerate_loops_back() {
        let mut workflow = Workflow::new(3);
        workflow.stage = WorkflowStage::Critique;
        workflow.regenerate();
        assert_eq!(workflow.stage, WorkflowStage::GenerateRecommendation);
        assert_eq!(workflow.iterations, 1);
    }

    fn critique(is_satisfactory: bool, critical: &[&str]) -> CritiqueResult {
        CritiqueResult {
            is_satisfactory,
            critical_issues: critical.iter().map(|s| s.to_string()).collect(),
            major_issues: Vec::new(),
            minor_issues: Vec::new(),
            strengths: Vec::new(),
            suggestions: Vec::new(),
            overall_assessment: String::new(),
        }
    }

    #[test]
    fn test_should_regenerate_matrix() {
        // Unsatisfied with a critical issue, under the bound: regenerate
        assert!(should_regenerate(Some(&critique(false, &["bad"])), 0, 3));
        // Bound exhausted
        assert!(!should_regenerate(Some(&critique(false, &["bad"])), 3, 3));
        // Satisfied
        assert!(!should_regenerate(Some(&critique(true, &["bad"])), 0, 3));
        // Unsatisfied but no critical issues
        assert!(!should_regenerate(Some(&critique(false, &[])), 0, 3));
        // Critique missing entirely
        assert!(!should_regenerate(None, 0, 3));
    }

    #[tokio::test]
    async fn test_successful_run_without_regeneration() {
        let model = Arc::new(ScriptedModel::new(CRITIC_ACCEPTS));
        let mut agent = CampaignAgent::new(model.clone(), config(3));

        let report = agent.analyze("camp_1234").await.unwrap();

        assert!(report.errors.is_empty());
        assert!(report.context.is_some());
        assert!(report.signal_analysis.is_some());
        assert!(report.recommendation.is_some());
        assert!(report.critique.unwrap().is_satisfactory);
        assert_eq!(report.iterations, 0);
        assert_eq!(model.strategist_calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.critic_calls.load(Ordering::SeqCst), 1);
        assert!(report.metadata.contains_key("completed_at"));
        assert!(report.metadata.contains_key("context_collection_ms"));
        assert!(report
            .events
            .iter()
            .any(|e| e.kind == AgentEventKind::RunCompleted));
    }

    #[tokio::test]
    async fn test_persistent_criticals_exhaust_iteration_budget() {
        let model = Arc::new(ScriptedModel::new(CRITIC_REJECTS));
        let mut agent = CampaignAgent::new(model.clone(), config(2));

        let report = agent.analyze("camp_1234").await.unwrap();

        // max_iterations=2: exactly 2 regenerations, finalize on the 3rd
        // attempt regardless of the critique's content
        assert_eq!(model.strategist_calls.load(Ordering::SeqCst), 3);
        assert_eq!(model.critic_calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.iterations, 2);
        assert!(report.recommendation.is_some());
        assert!(!report.critique.unwrap().is_satisfactory);
        assert_eq!(
            report
                .events
                .iter()
                .filter(|e| e.kind == AgentEventKind::RecommendationRejected)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_collection_failure_short_circuits() {
        let model = Arc::new(ScriptedModel::new(CRITIC_ACCEPTS));
        let builder = ContextBuilder::with_collectors(
            FailingCampaignCollector,
            CreativeMetricsCollector::new(),
            CompetitorSignalsCollector::new(),
        );
        let mut agent = CampaignAgent::with_context_builder(model.clone(), config(3), builder);

        let report = agent.analyze("camp_1234").await.unwrap();

        assert!(!report.errors.is_empty());
        assert!(report.errors[0].contains("campaign_metrics"));
        assert!(report.context.is_none());
        assert!(report.signal_analysis.is_none());
        assert!(report.recommendation.is_none());
        // No reasoning stage ever ran
        assert_eq!(model.analyst_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analysis_failure_is_fatal() {
        let mut model = ScriptedModel::new(CRITIC_ACCEPTS);
        model.fail_analyst = true;
        let model = Arc::new(model);
        let mut agent = CampaignAgent::new(model.clone(), config(3));

        let report = agent.analyze("camp_1234").await.unwrap();

        assert!(report.errors.iter().any(|e| e.contains("Signal analysis failed")));
        assert!(report.context.is_some());
        assert!(report.signal_analysis.is_none());
        // No recommendation is generated from a missing analysis
        assert!(report.recommendation.is_none());
        assert_eq!(model.strategist_calls.load(Ordering::SeqCst), 0);
        assert!(report.metadata.contains_key("completed_at"));
    }

    #[tokio::test]
    async fn test_critique_failure_is_fail_open() {
        let mut model = ScriptedModel::new(CRITIC_ACCEPTS);
        model.fail_critic = true;
        let model = Arc::new(model);
        let mut agent = CampaignAgent::new(model.clone(), config(3));

        let report = agent.analyze("camp_1234").await.unwrap();

        assert!(report.recommendation.is_some());
        let critique = report.critique.unwrap();
        assert!(critique.is_satisfactory);
        assert!(report.errors.iter().any(|e| e.contains("Critique failed")));
        // Fail-open means no regeneration loop
        assert_eq!(model.strategist_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_time_budget_exceeded_is_cancellation() {
        let mut agent = CampaignAgent::new(
            Arc::new(SlowModel),
            AgentConfig {
                max_iterations: 3,
                timeout_secs: 0,
                model_version: None,
            },
        );

        let err = agent.analyze("camp_1234").await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_events_stream_to_channel() {
        let (tx, mut rx) = mpsc::channel(64);
        let model = Arc::new(ScriptedModel::new(CRITIC_ACCEPTS));
        let mut agent = CampaignAgent::new(model, config(3)).with_event_channel(tx);

        let report = agent.analyze("camp_1234").await.unwrap();

        let mut streamed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            streamed.push(event);
        }
        assert_eq!(streamed.len(), report.events.len());
        assert_eq!(streamed[0].kind, AgentEventKind::RunStarted);
    }
}
