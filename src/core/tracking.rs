use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Detected,
    Generating,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Detected => "detected",
            CampaignStatus::Generating => "generating",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }
}

pub fn can_transition(from: CampaignStatus, to: CampaignStatus) -> bool {
    if from == to {
        return true;
    }
    match from {
        CampaignStatus::Detected => matches!(
            to,
            CampaignStatus::Generating | CampaignStatus::Failed
        ),
        CampaignStatus::Generating => matches!(
            to,
            CampaignStatus::Completed | CampaignStatus::Failed
        ),
        CampaignStatus::Completed | CampaignStatus::Failed => false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignTrackingEntry {
    pub campaign_id: String,
    pub brief_file: PathBuf,
    pub detected_at: DateTime<Utc>,
    status: CampaignStatus,
    pub variants_generated: u32,
    pub target_variants: u32,
    pub products_processed: u32,
    pub aspect_ratios_covered: BTreeSet<String>,
    pub diversity_score: u32,
    pub generation_started: Option<DateTime<Utc>>,
    pub generation_completed: Option<DateTime<Utc>>,
    pub output_path: Option<PathBuf>,
    pub api_cost: f64,
}

impl CampaignTrackingEntry {
    pub fn new(campaign_id: String, brief_file: PathBuf, detected_at: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            brief_file,
            detected_at,
            status: CampaignStatus::Detected,
            variants_generated: 0,
            target_variants: 0,
            products_processed: 0,
            aspect_ratios_covered: BTreeSet::new(),
            diversity_score: 0,
            generation_started: None,
            generation_completed: None,
            output_path: None,
            api_cost: 0.0,
        }
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    /// Moves the campaign forward. Regressions are refused and leave the entry untouched.
    pub fn advance(&mut self, to: CampaignStatus) -> bool {
        if !can_transition(self.status, to) {
            return false;
        }
        self.status = to;
        true
    }

    pub fn refresh_diversity(&mut self) {
        self.diversity_score = self.products_processed * self.aspect_ratios_covered.len() as u32;
    }

    pub fn completion_rate(&self) -> f64 {
        if self.target_variants == 0 {
            return 0.0;
        }
        self.variants_generated as f64 / self.target_variants as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub detected: usize,
    pub generating: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.detected + self.generating + self.completed + self.failed
    }

    /// `completed / (completed + failed)`, or `None` when nothing has finished yet.
    pub fn success_rate(&self) -> Option<f64> {
        let finished = self.completed + self.failed;
        if finished == 0 {
            return None;
        }
        Some(self.completed as f64 / finished as f64)
    }
}

/// In-memory campaign table. Ordered by id so status output and scans are stable.
#[derive(Debug, Default)]
pub struct CampaignTracker {
    entries: BTreeMap<String, CampaignTrackingEntry>,
}

impl CampaignTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, campaign_id: &str) -> bool {
        self.entries.contains_key(campaign_id)
    }

    pub fn insert(&mut self, entry: CampaignTrackingEntry) {
        self.entries.entry(entry.campaign_id.clone()).or_insert(entry);
    }

    pub fn get(&self, campaign_id: &str) -> Option<&CampaignTrackingEntry> {
        self.entries.get(campaign_id)
    }

    pub fn get_mut(&mut self, campaign_id: &str) -> Option<&mut CampaignTrackingEntry> {
        self.entries.get_mut(campaign_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CampaignTrackingEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.entries.values() {
            match entry.status {
                CampaignStatus::Detected => counts.detected += 1,
                CampaignStatus::Generating => counts.generating += 1,
                CampaignStatus::Completed => counts.completed += 1,
                CampaignStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn detected_since(&self, since: DateTime<Utc>) -> Vec<&CampaignTrackingEntry> {
        self.entries
            .values()
            .filter(|e| e.detected_at >= since)
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, CampaignTrackingEntry> {
        self.entries.clone()
    }
}
