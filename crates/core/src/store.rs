//! # Recommendation Store
//!
//! SQLite-backed persistence for finalized analysis reports. Write once
//! after finalize, readable by id.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::agent::AnalysisReport;

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Decision status stamped on every newly persisted recommendation
const STATUS_PENDING_REVIEW: &str = "pending_review";

/// A persisted recommendation row
#[derive(Debug, Clone)]
pub struct StoredRecommendation {
    pub id: String,
    pub campaign_id: String,
    pub workflow: String,
    pub risk_level: String,
    pub confidence: f64,
    pub decision_status: String,
    pub created_at: String,
    /// Full report snapshot, including context and alternatives
    pub report: AnalysisReport,
}

/// SQLite-backed recommendation store with a shared connection
pub struct RecommendationStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecommendationStore {
    /// Open or create the store at `.adsage/adsage.db`
    pub fn open() -> Result<Self> {
        Self::open_at(".adsage/adsage.db")
    }

    /// Open the store at a specific path (useful for testing)
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn =
            Connection::open(path.as_ref()).context("Failed to open recommendation database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            conn.execute(
                r#"
                CREATE TABLE IF NOT EXISTS recommendations (
                    id TEXT PRIMARY KEY,
                    campaign_id TEXT NOT NULL,
                    workflow TEXT NOT NULL,
                    risk_level TEXT NOT NULL,
                    confidence REAL NOT NULL,
                    decision_status TEXT NOT NULL DEFAULT 'pending_review',
                    report_json TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_recommendations_campaign ON recommendations(campaign_id)",
                [],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        tracing::debug!(
            "recommendation store ready at schema version {}",
            SCHEMA_VERSION
        );
        Ok(())
    }

    /// Persist a finalized report under a generated id.
    ///
    /// Fails if the report carries no recommendation (aborted runs are
    /// not persisted).
    pub fn save(&self, report: &AnalysisReport) -> Result<String> {
        let recommendation = report
            .recommendation
            .as_ref()
            .context("report has no recommendation to persist")?;

        let id = generate_id();
        let report_json =
            serde_json::to_string(report).context("Failed to serialize analysis report")?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO recommendations
                (id, campaign_id, workflow, risk_level, confidence, decision_status, report_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                report.campaign_id,
                recommendation.recommended_workflow.label(),
                recommendation.risk_level.as_str(),
                recommendation.confidence,
                STATUS_PENDING_REVIEW,
                report_json,
            ],
        )
        .context("Failed to insert recommendation")?;

        Ok(id)
    }

    /// Load a persisted recommendation by id
    pub fn load(&self, id: &str) -> Result<StoredRecommendation> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let (campaign_id, workflow, risk_level, confidence, decision_status, created_at, report_json): (
            String,
            String,
            String,
            f64,
            String,
            String,
            String,
        ) = conn
            .query_row(
                r#"
                SELECT campaign_id, workflow, risk_level, confidence, decision_status, created_at, report_json
                FROM recommendations
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .with_context(|| format!("Recommendation '{}' not found", id))?;

        let report = serde_json::from_str(&report_json)
            .context("Failed to deserialize stored report")?;

        Ok(StoredRecommendation {
            id: id.to_string(),
            campaign_id,
            workflow,
            risk_level,
            confidence,
            decision_status,
            created_at,
            report,
        })
    }

    /// Count persisted recommendations
    pub fn count(&self) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM recommendations", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Generate a recommendation id (not cryptographic)
fn generate_id() -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("rec-{:x}-{:08x}", nanos, rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recommendation, RiskLevel, WorkflowType};
    use std::collections::HashMap;
    use std::fs;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            campaign_id: "camp_1234".to_string(),
            recommendation: Some(Recommendation {
                recommended_workflow: WorkflowType::CreativeRefresh,
                reasoning: "Fatigue is suppressing CTR".to_string(),
                specific_actions: "Launch 3 new variants".to_string(),
                expected_impact: "CTR above 2.5%".to_string(),
                risk_level: RiskLevel::Medium,
                confidence: 0.8,
                timeline: "10-14 days".to_string(),
                success_criteria: "CPA below $45".to_string(),
                alternatives: Vec::new(),
                signal_analysis: "analysis".to_string(),
                model_version: Some("gpt-4o".to_string()),
            }),
            signal_analysis: None,
            critique: None,
            context: None,
            iterations: 1,
            errors: Vec::new(),
            metadata: HashMap::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = ".adsage/test_store.db";
        let _ = fs::remove_file(path);

        let store = RecommendationStore::open_at(path).unwrap();
        let report = sample_report();
        let id = store.save(&report).unwrap();

        let stored = store.load(&id).unwrap();
        assert_eq!(stored.campaign_id, "camp_1234");
        assert_eq!(stored.workflow, "Creative Refresh");
        assert_eq!(stored.risk_level, "medium");
        assert_eq!(stored.decision_status, "pending_review");
        assert_eq!(
            stored.report.recommendation.unwrap().recommended_workflow,
            WorkflowType::CreativeRefresh
        );

        assert_eq!(store.count().unwrap(), 1);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_save_rejects_report_without_recommendation() {
        let path = ".adsage/test_store_empty.db";
        let _ = fs::remove_file(path);

        let store = RecommendationStore::open_at(path).unwrap();
        let mut report = sample_report();
        report.recommendation = None;
        assert!(store.save(&report).is_err());
        assert_eq!(store.count().unwrap(), 0);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
