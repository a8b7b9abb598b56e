//! # AdSage Models
//!
//! Structured outputs produced by the reasoning stages, plus the message
//! transcript types threaded through the pipeline. These all derive
//! `JsonSchema` so the text-extraction layer can later be swapped for
//! schema-constrained generation without touching orchestration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Workflow the agent can recommend for a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WorkflowType {
    #[serde(rename = "Creative Refresh")]
    CreativeRefresh,
    #[serde(rename = "Audience Expansion")]
    AudienceExpansion,
    #[serde(rename = "Bid Adjustment")]
    BidAdjustment,
    #[serde(rename = "Campaign Pause")]
    CampaignPause,
    #[serde(rename = "Budget Reallocation")]
    BudgetReallocation,
    #[serde(rename = "Continue Monitoring")]
    ContinueMonitoring,
}

impl WorkflowType {
    /// All workflows, in recommendation-vocabulary order
    pub const ALL: [WorkflowType; 6] = [
        WorkflowType::CreativeRefresh,
        WorkflowType::AudienceExpansion,
        WorkflowType::BidAdjustment,
        WorkflowType::CampaignPause,
        WorkflowType::BudgetReallocation,
        WorkflowType::ContinueMonitoring,
    ];

    /// Human-readable label matched against model output
    pub fn label(self) -> &'static str {
        match self {
            WorkflowType::CreativeRefresh => "Creative Refresh",
            WorkflowType::AudienceExpansion => "Audience Expansion",
            WorkflowType::BidAdjustment => "Bid Adjustment",
            WorkflowType::CampaignPause => "Campaign Pause",
            WorkflowType::BudgetReallocation => "Budget Reallocation",
            WorkflowType::ContinueMonitoring => "Continue Monitoring",
        }
    }
}

/// Risk assessment for a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Structured output of the signal-analysis stage
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SignalAnalysis {
    /// What metrics changed and by how much
    pub key_signals: String,
    /// How the different signals relate to each other
    pub signal_correlation: String,
    /// Most likely explanation for the observed changes
    pub root_cause: String,
    /// Confidence in the analysis (0.0 - 1.0)
    pub confidence: f64,
    /// Specific data points backing the conclusion
    pub supporting_evidence: String,
    /// Other explanations that could fit the data
    pub alternate_hypotheses: String,
}

/// A workflow that was considered but not recommended
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlternativeAction {
    pub workflow: WorkflowType,
    pub why_not_recommended: String,
}

/// Structured output of the recommendation stage
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub recommended_workflow: WorkflowType,
    /// Explanation connecting the root cause to the chosen action
    pub reasoning: String,
    /// Concrete steps to take
    pub specific_actions: String,
    /// What metrics should improve, and by how much
    pub expected_impact: String,
    pub risk_level: RiskLevel,
    /// Confidence in the recommendation (0.0 - 1.0)
    pub confidence: f64,
    /// When to expect results
    pub timeline: String,
    /// How to measure whether it worked
    pub success_criteria: String,
    #[serde(default)]
    pub alternatives: Vec<AlternativeAction>,
    /// The analysis text this recommendation is grounded in
    pub signal_analysis: String,
    /// Model that generated the recommendation
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Critique of a recommendation
///
/// Any entry in `critical_issues` forces regeneration regardless of the
/// satisfaction flag.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CritiqueResult {
    pub is_satisfactory: bool,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub major_issues: Vec<String>,
    #[serde(default)]
    pub minor_issues: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub overall_assessment: String,
}

impl CritiqueResult {
    /// Fail-open critique used when the critique stage itself fails,
    /// so the pipeline always terminates.
    pub fn fail_open(assessment: impl Into<String>) -> Self {
        Self {
            is_satisfactory: true,
            critical_issues: Vec::new(),
            major_issues: Vec::new(),
            minor_issues: Vec::new(),
            strengths: Vec::new(),
            suggestions: Vec::new(),
            overall_assessment: assessment.into(),
        }
    }
}

/// Role of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One entry in the pipeline's accumulated message transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}
