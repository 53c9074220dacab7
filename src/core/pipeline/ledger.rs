use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::CostLedger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEntry {
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    entries: Vec<CostEntry>,
}

/// Reads the JSON cost ledger the generation pipeline appends to.
pub struct FileCostLedger {
    path: PathBuf,
}

impl FileCostLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn total_for_day(entries: &[CostEntry], day: NaiveDate) -> f64 {
        entries
            .iter()
            .filter(|e| e.timestamp.date_naive() == day)
            .map(|e| e.amount)
            .sum()
    }
}

#[async_trait]
impl CostLedger for FileCostLedger {
    async fn total_cost_for_day(&self, day: NaiveDate) -> Result<f64> {
        if !self.path.exists() {
            return Ok(0.0);
        }
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading cost ledger {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(0.0);
        }
        let ledger: LedgerFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing cost ledger {}", self.path.display()))?;
        Ok(Self::total_for_day(&ledger.entries, day))
    }
}
