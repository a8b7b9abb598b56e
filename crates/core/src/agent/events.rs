//! # Pipeline Events
//!
//! Observability events emitted by the orchestrator, appended to the run
//! log and optionally streamed to a caller-supplied channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workflow::WorkflowStage;

/// Kind of pipeline event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventKind {
    /// Pipeline run started
    RunStarted,
    /// A stage started working
    StageStarted,
    /// A stage completed successfully
    StageCompleted,
    /// A stage failed
    StageFailed,
    /// Critic found critical issues, looping back to the strategist
    RecommendationRejected,
    /// Pipeline run finished (however termination was reached)
    RunCompleted,
}

/// An event in a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Unique event ID
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AgentEventKind,
    /// Stage the event belongs to
    pub stage: WorkflowStage,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl AgentEvent {
    pub fn new(kind: AgentEventKind, stage: WorkflowStage) -> Self {
        Self {
            id: event_id(),
            timestamp: Utc::now(),
            kind,
            stage,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Generate a unique event id (not cryptographic)
fn event_id() -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("{:x}-{:08x}", nanos, rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = AgentEvent::new(AgentEventKind::StageStarted, WorkflowStage::Critique)
            .with_data(serde_json::json!({ "iteration": 1 }));

        assert_eq!(event.kind, AgentEventKind::StageStarted);
        assert_eq!(event.stage, WorkflowStage::Critique);
        assert!(event.data.is_some());
        assert!(!event.id.is_empty());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = AgentEvent::new(AgentEventKind::RunStarted, WorkflowStage::CollectContext);
        let b = AgentEvent::new(AgentEventKind::RunStarted, WorkflowStage::CollectContext);
        assert_ne!(a.id, b.id);
    }
}
