//! AdSage CLI
//!
//! Two surfaces: `analyze` runs the reasoning pipeline against a
//! campaign, `gate` enforces the evaluation quality thresholds in CI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use adsage_core::agent::{AgentConfig, CampaignAgent};
use adsage_core::evaluation::{self, Thresholds};
use adsage_core::llm::{HttpChatModel, ModelConfig};
use adsage_core::store::RecommendationStore;

#[derive(Parser)]
#[command(name = "adsage", about = "AdSage - Campaign Reasoning Agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a campaign and print the recommendation report
    Analyze {
        /// Campaign identifier
        #[arg(long)]
        campaign_id: String,
        /// Maximum critic-forced regenerations
        #[arg(long, default_value_t = 3)]
        max_iterations: u32,
        /// Overall time budget for the run, in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
        /// Persist the report to this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
        /// Stream pipeline events to stderr as they happen
        #[arg(long)]
        events: bool,
    },
    /// Check evaluation results against quality thresholds
    Gate {
        /// Directory containing evaluation result files
        #[arg(long, default_value = "evaluation/results")]
        results_dir: PathBuf,
        /// Minimum pass rate (0-1)
        #[arg(long, default_value_t = 0.85)]
        min_pass_rate: f64,
        /// Minimum average relevance score (0-1)
        #[arg(long, default_value_t = 0.70)]
        min_relevance: f64,
        /// Minimum average accuracy score (0-1)
        #[arg(long, default_value_t = 0.70)]
        min_accuracy: f64,
        /// Minimum average completeness score (0-1)
        #[arg(long, default_value_t = 0.80)]
        min_completeness: f64,
        /// Minimum average coherence score (0-1)
        #[arg(long, default_value_t = 0.70)]
        min_coherence: f64,
        /// Minimum average safety score (0-1)
        #[arg(long, default_value_t = 1.00)]
        min_safety: f64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            campaign_id,
            max_iterations,
            timeout_secs,
            db,
            events,
        } => run_analyze(campaign_id, max_iterations, timeout_secs, db, events).await,
        Command::Gate {
            results_dir,
            min_pass_rate,
            min_relevance,
            min_accuracy,
            min_completeness,
            min_coherence,
            min_safety,
        } => run_gate(
            results_dir,
            Thresholds {
                min_pass_rate,
                min_relevance,
                min_accuracy,
                min_completeness,
                min_coherence,
                min_safety,
            },
        ),
    }
}

async fn run_analyze(
    campaign_id: String,
    max_iterations: u32,
    timeout_secs: u64,
    db: Option<PathBuf>,
    events: bool,
) -> Result<ExitCode> {
    let model_config = ModelConfig::from_env();
    let model_version = model_config.model.clone();
    let model = HttpChatModel::new(model_config).context("Failed to configure chat model")?;

    let config = AgentConfig {
        max_iterations,
        timeout_secs,
        model_version: Some(model_version),
    };
    let mut agent = CampaignAgent::new(Arc::new(model), config);

    if events {
        let (tx, mut rx) = mpsc::channel(64);
        agent = agent.with_event_channel(tx);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                eprintln!("{}", serde_json::to_string(&event).unwrap_or_default());
            }
        });
    }

    let report = agent.analyze(&campaign_id).await?;

    if let Some(db_path) = db {
        if report.recommendation.is_some() {
            let store = RecommendationStore::open_at(&db_path)?;
            let id = store.save(&report)?;
            tracing::info!(id = %id, db = %db_path.display(), "recommendation persisted");
        } else {
            tracing::warn!("run produced no recommendation, nothing persisted");
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_gate(results_dir: PathBuf, thresholds: Thresholds) -> Result<ExitCode> {
    println!("Loading results from {}...", results_dir.display());
    let runs = match evaluation::load_results(&results_dir) {
        Ok(runs) => runs,
        Err(err) => {
            println!("❌ {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Loaded {} result files", runs.len());

    let aggregates = match evaluation::aggregate(&runs) {
        Ok(aggregates) => aggregates,
        Err(err) => {
            println!("❌ Failed to aggregate results: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("\n📊 Evaluation Summary:");
    println!("  Total Cases: {}", aggregates.total_cases);
    println!("  Pass Rate: {:.1}%", aggregates.pass_rate * 100.0);
    println!("  Avg Relevance: {:.3}", aggregates.avg_relevance);
    println!("  Avg Accuracy: {:.3}", aggregates.avg_accuracy);
    println!("  Avg Completeness: {:.3}", aggregates.avg_completeness);
    println!("  Avg Coherence: {:.3}", aggregates.avg_coherence);
    println!("  Avg Safety: {:.3}", aggregates.avg_safety);

    println!("\n🎯 Checking Thresholds:");
    println!("  Min Pass Rate: {:.1}%", thresholds.min_pass_rate * 100.0);
    println!("  Min Relevance: {:.3}", thresholds.min_relevance);
    println!("  Min Accuracy: {:.3}", thresholds.min_accuracy);
    println!("  Min Completeness: {:.3}", thresholds.min_completeness);
    println!("  Min Coherence: {:.3}", thresholds.min_coherence);
    println!("  Min Safety: {:.3}", thresholds.min_safety);

    let violations = evaluation::check_thresholds(&aggregates, &thresholds);
    if violations.is_empty() {
        println!("\n✅ All thresholds passed!");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("\n❌ Threshold violations detected:");
        for violation in &violations {
            println!("  • {violation}");
        }
        Ok(ExitCode::FAILURE)
    }
}
