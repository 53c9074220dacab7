mod health;
mod scenarios;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use super::{Collaborators, CreativeAutomationAgent};
use crate::core::alert::{Alert, AlertType};
use crate::core::brief::FsBriefSource;
use crate::core::clock::ManualClock;
use crate::core::config::{AgentSettings, PathSettings};
use crate::core::pipeline::{
    CostLedger, FsOutputInspector, GenerationPipeline, GenerationReport, GenerationRequest,
};

/// Reports a fixed number of variants under `<output_root>/<campaign>`.
pub(super) struct ReportPipeline {
    pub variants: u32,
    pub cost: f64,
    pub output_root: PathBuf,
}

#[async_trait]
impl GenerationPipeline for ReportPipeline {
    async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        Ok(GenerationReport {
            variants_generated: self.variants,
            output_path: self.output_root.join(&request.campaign_id),
            total_cost: self.cost,
        })
    }
}

pub(super) struct FailingPipeline;

#[async_trait]
impl GenerationPipeline for FailingPipeline {
    async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        Err(anyhow!("image API unavailable for {}", request.campaign_id))
    }
}

pub(super) struct PanickingPipeline;

#[async_trait]
impl GenerationPipeline for PanickingPipeline {
    async fn run(&self, _request: &GenerationRequest) -> Result<GenerationReport> {
        panic!("renderer crashed");
    }
}

pub(super) struct SlowPipeline(pub Duration);

#[async_trait]
impl GenerationPipeline for SlowPipeline {
    async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        tokio::time::sleep(self.0).await;
        Ok(GenerationReport {
            variants_generated: 6,
            output_path: PathBuf::from(&request.campaign_id),
            total_cost: 0.0,
        })
    }
}

pub(super) struct FixedLedger(pub f64);

#[async_trait]
impl CostLedger for FixedLedger {
    async fn total_cost_for_day(&self, _day: NaiveDate) -> Result<f64> {
        Ok(self.0)
    }
}

/// Returns zero and records every day it was asked about, one entry per cycle.
#[derive(Default)]
pub(super) struct RecordingLedger {
    pub days: Mutex<Vec<NaiveDate>>,
    pub calls: AtomicUsize,
}

impl RecordingLedger {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CostLedger for RecordingLedger {
    async fn total_cost_for_day(&self, day: NaiveDate) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.days.lock().unwrap().push(day);
        Ok(0.0)
    }
}

pub(super) struct BrokenLedger;

#[async_trait]
impl CostLedger for BrokenLedger {
    async fn total_cost_for_day(&self, _day: NaiveDate) -> Result<f64> {
        Err(anyhow!("cost ledger is locked"))
    }
}

pub(super) struct Harness {
    pub agent: CreativeAutomationAgent,
    pub clock: Arc<ManualClock>,
    pub settings: AgentSettings,
    pub tmp: TempDir,
}

impl Harness {
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn briefs_dir(&self) -> &Path {
        &self.settings.paths.briefs_dir
    }

    pub fn alerts_of(&self, kind: AlertType) -> Vec<&Alert> {
        self.agent
            .get_alert_history()
            .iter()
            .filter(|a| a.alert_type == kind)
            .collect()
    }
}

pub(super) fn settings_in(root: &Path) -> AgentSettings {
    AgentSettings {
        paths: PathSettings {
            briefs_dir: root.join("campaign_briefs"),
            output_dir: root.join("output"),
            alerts_dir: root.join("alerts"),
            logs_dir: root.join("logs"),
            cost_ledger: root.join("costs.json"),
        },
        ..AgentSettings::default()
    }
}

pub(super) fn harness(
    pipeline: Arc<dyn GenerationPipeline>,
    ledger: Arc<dyn CostLedger>,
    tweak: impl FnOnce(&mut AgentSettings),
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = settings_in(tmp.path());
    tweak(&mut settings);
    std::fs::create_dir_all(&settings.paths.briefs_dir).unwrap();

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let agent = CreativeAutomationAgent::new(
        &settings,
        Collaborators {
            briefs: Arc::new(FsBriefSource::new(&settings.paths.briefs_dir)),
            pipeline,
            ledger,
            outputs: Arc::new(FsOutputInspector),
            llm: None,
            clock: clock.clone(),
        },
    );
    Harness {
        agent,
        clock,
        settings,
        tmp,
    }
}

pub(super) fn output_root(root: &Path) -> PathBuf {
    root.join("output")
}

pub(super) fn write_brief(dir: &Path, id: &str, products: &[&str]) {
    let products = products
        .iter()
        .map(|p| format!("  - {}", p))
        .collect::<Vec<_>>()
        .join("\n");
    let yaml = format!(
        "campaign_name: {id}\nproducts:\n{products}\ntarget_region: EMEA\ntarget_audience: commuters\ncampaign_message: Move more\n"
    );
    std::fs::write(dir.join(format!("{}.yaml", id)), yaml).unwrap();
}

pub(super) fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"img").unwrap();
}
