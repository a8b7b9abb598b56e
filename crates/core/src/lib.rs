//! # AdSage Core
//!
//! The "Brain" of the AdSage system - contains the campaign telemetry
//! collectors, the reasoning pipeline, and the evaluation gate.
//!
//! ## Architecture
//!
//! - `collectors/` - Telemetry collectors and the parallel context aggregator
//! - `agent/` - Reasoning stages (analyst, strategist, critic) and the pipeline orchestrator
//! - `llm` - Text-generation service boundary
//! - `evaluation` - Golden-dataset aggregation and the CI threshold gate
//! - `store` - Recommendation persistence
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adsage_core::agent::{AgentConfig, CampaignAgent};
//! use adsage_core::llm::{HttpChatModel, ModelConfig};
//!
//! let model = HttpChatModel::new(ModelConfig::from_env())?;
//! let mut agent = CampaignAgent::new(Arc::new(model), AgentConfig::default());
//! let report = agent.analyze("camp_1234").await?;
//! ```

pub mod agent;
pub mod collectors;
pub mod evaluation;
pub mod llm;
pub mod models;
pub mod store;
