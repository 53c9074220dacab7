//! Narrow interfaces to the systems the agent supervises but does not implement:
//! the generation pipeline, the cost ledger and the generated-output tree.

mod command;
mod ledger;
mod outputs;

pub use command::CommandPipeline;
pub use ledger::{CostEntry, FileCostLedger};
pub use outputs::{FsOutputInspector, OutputFile, OutputTree, aspect_ratio_tag};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::brief::CampaignBrief;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub campaign_id: String,
    pub brief_path: PathBuf,
    pub brief: CampaignBrief,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub variants_generated: u32,
    pub output_path: PathBuf,
    #[serde(default)]
    pub total_cost: f64,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no generation command configured (set [generation].command in agent.toml)")]
    NotConfigured,
    #[error("failed to launch generation command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("generation command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("generation command produced no report on stdout")]
    MissingReport,
    #[error("generation report is not valid JSON: {0}")]
    BadReport(#[source] serde_json::Error),
    #[error("generation did not finish within {0}s")]
    TimedOut(u64),
    #[error("generation task aborted: {0}")]
    Aborted(String),
}

/// Runs the full creative generation for one brief. May take minutes; the agent
/// always drives it from a spawned task.
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport>;
}

#[async_trait]
pub trait CostLedger: Send + Sync {
    /// Sum of the costs recorded on `day` (UTC). The agent passes the day from its clock.
    async fn total_cost_for_day(&self, day: NaiveDate) -> Result<f64>;
}

#[async_trait]
pub trait OutputInspector: Send + Sync {
    async fn list_output_files(&self, campaign_output_dir: &Path) -> Result<OutputTree>;
}
