mod adaptive;
mod cycle;
mod detection;
mod health;

pub use cycle::MonitorHandle;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::alert::{Alert, AlertStore, AlertType, PersistError, Severity};
use crate::core::breaker::CircuitBreaker;
use crate::core::brief::{BriefSource, FsBriefSource};
use crate::core::clock::{Clock, SystemClock};
use crate::core::comms::{
    BusinessContext, ContextInputs, RenderSource, StakeholderCommunicator, build_context,
};
use crate::core::config::{AgentConfig, AgentSettings, MonitorSettings};
use crate::core::llm::{self, LlmProvider};
use crate::core::pipeline::{
    CommandPipeline, CostLedger, FileCostLedger, FsOutputInspector, GenerationPipeline,
    OutputInspector,
};
use crate::core::tracking::{CampaignTracker, CampaignTrackingEntry, StatusCounts};

/// External systems the agent drives. Everything here is a black box to the agent.
pub struct Collaborators {
    pub briefs: Arc<dyn BriefSource>,
    pub pipeline: Arc<dyn GenerationPipeline>,
    pub ledger: Arc<dyn CostLedger>,
    pub outputs: Arc<dyn OutputInspector>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Filesystem/shell-backed collaborators described by `agent.toml`.
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            briefs: Arc::new(FsBriefSource::new(&settings.paths.briefs_dir)),
            pipeline: Arc::new(CommandPipeline::new(settings.generation.command.clone())),
            ledger: Arc::new(FileCostLedger::new(&settings.paths.cost_ledger)),
            outputs: Arc::new(FsOutputInspector),
            llm: llm::provider_from_settings(&settings.llm),
            clock: Arc::new(SystemClock),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub monitoring: bool,
    pub tracked_campaigns: usize,
    pub total_alerts: usize,
    pub pending_alerts: usize,
    pub campaigns: StatusCounts,
    pub circuit_breaker: CircuitBreaker,
    pub thresholds: AgentConfig,
    pub language_model: bool,
    pub persistence_warnings: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct CommunicationRecord<'a> {
    alert_id: &'a str,
    alert: &'a Alert,
    context: &'a BusinessContext,
    communication: &'a str,
    rendered_by: RenderSource,
    generated_at: DateTime<Utc>,
}

/// The autonomous monitor. Owns the tracking table, alert history, breaker and
/// thresholds; only its own control loop mutates them.
pub struct CreativeAutomationAgent {
    config: AgentConfig,
    monitor: MonitorSettings,
    output_root: PathBuf,
    tracker: CampaignTracker,
    alert_history: Vec<Alert>,
    breaker: CircuitBreaker,
    store: AlertStore,
    communicator: StakeholderCommunicator,
    briefs: Arc<dyn BriefSource>,
    pipeline: Arc<dyn GenerationPipeline>,
    ledger: Arc<dyn CostLedger>,
    outputs: Arc<dyn OutputInspector>,
    clock: Arc<dyn Clock>,
    handle: MonitorHandle,
    alert_seq: u64,
    rejected_briefs: HashSet<String>,
    variant_alerted: HashSet<String>,
    last_total_cost: f64,
    failures_this_cycle: u32,
    persistence_warnings: Vec<String>,
}

impl CreativeAutomationAgent {
    pub fn new(settings: &AgentSettings, collaborators: Collaborators) -> Self {
        let config = settings.thresholds.clone();
        let breaker = CircuitBreaker::new(config.circuit_breaker_threshold, config.recovery_timeout);
        let communicator = StakeholderCommunicator::new(
            collaborators.llm,
            Duration::from_secs(settings.llm.timeout_secs.max(1)),
        );
        Self {
            config,
            monitor: settings.monitor.clone(),
            output_root: settings.paths.output_dir.clone(),
            tracker: CampaignTracker::new(),
            alert_history: Vec::new(),
            breaker,
            store: AlertStore::new(&settings.paths.alerts_dir, &settings.paths.logs_dir),
            communicator,
            briefs: collaborators.briefs,
            pipeline: collaborators.pipeline,
            ledger: collaborators.ledger,
            outputs: collaborators.outputs,
            clock: collaborators.clock,
            handle: MonitorHandle::default(),
            alert_seq: 0,
            rejected_briefs: HashSet::new(),
            variant_alerted: HashSet::new(),
            last_total_cost: 0.0,
            failures_this_cycle: 0,
            persistence_warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn alert_store(&self) -> &AlertStore {
        &self.store
    }

    pub fn get_alert_history(&self) -> &[Alert] {
        &self.alert_history
    }

    pub fn get_campaign_tracking(&self) -> BTreeMap<String, CampaignTrackingEntry> {
        self.tracker.snapshot()
    }

    pub fn persistence_warnings(&self) -> &[String] {
        &self.persistence_warnings
    }

    pub fn get_status(&self) -> AgentStatus {
        AgentStatus {
            monitoring: self.handle.is_running(),
            tracked_campaigns: self.tracker.len(),
            total_alerts: self.alert_history.len(),
            pending_alerts: self.alert_history.iter().filter(|a| a.is_pending()).count(),
            campaigns: self.tracker.counts(),
            circuit_breaker: self.breaker.clone(),
            thresholds: self.config.clone(),
            language_model: self.communicator.has_language_model(),
            persistence_warnings: self.persistence_warnings.len(),
        }
    }

    /// Records a new pending alert and mirrors it to `alerts/<id>.json`. A failed write
    /// is kept as a persistence warning; the alert still enters the history.
    pub async fn create_alert(
        &mut self,
        alert_type: impl Into<AlertType>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Alert {
        let now = self.clock.now();
        self.alert_seq += 1;
        let alert = Alert::new(
            format!("alert_{}_{}", self.alert_seq, now.timestamp()),
            alert_type.into(),
            message,
            severity,
            now,
        );

        match severity {
            Severity::High | Severity::Critical => warn!(
                "[{}] {} alert {}: {}",
                severity.as_str().to_uppercase(),
                alert.alert_type,
                alert.id,
                alert.message
            ),
            Severity::Low | Severity::Medium => info!(
                "[{}] {} alert {}: {}",
                severity.as_str().to_uppercase(),
                alert.alert_type,
                alert.id,
                alert.message
            ),
        }

        if let Err(e) = self.store.persist_alert(&alert).await {
            self.note_persistence_warning(e);
        }
        self.alert_history.push(alert.clone());
        alert
    }

    /// Renders and logs a communication for every pending alert. An alert whose logs
    /// cannot be written stays pending and is retried next cycle.
    pub async fn process_alerts(&mut self) -> ProcessSummary {
        let pending: Vec<usize> = self
            .alert_history
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_pending())
            .map(|(i, _)| i)
            .collect();

        let mut summary = ProcessSummary::default();
        for idx in pending {
            let alert = self.alert_history[idx].clone();
            let now = self.clock.now();
            let context = build_context(
                &alert,
                &ContextInputs {
                    tracker: &self.tracker,
                    history: &self.alert_history,
                    total_cost: self.last_total_cost,
                    config: &self.config,
                    now,
                },
            );
            let communication = self.communicator.render(&alert, &context).await;
            let record = CommunicationRecord {
                alert_id: &alert.id,
                alert: &alert,
                context: &context,
                communication: &communication.text,
                rendered_by: communication.source,
                generated_at: now,
            };

            match self
                .store
                .persist_communication(&alert.id, &record, &communication.text)
                .await
            {
                Ok(_) => {
                    self.alert_history[idx].mark_processed(now);
                    summary.processed += 1;
                }
                Err(e) => {
                    warn!("Could not log communication for {}: {}", alert.id, e);
                    self.note_persistence_warning(e);
                    summary.failed += 1;
                }
            }
        }

        if summary.processed > 0 || summary.failed > 0 {
            info!(
                "Processed {} alert(s), {} left pending",
                summary.processed, summary.failed
            );
        }
        summary
    }

    /// Counts one failure against the breaker; raises the instability alert on the trip.
    pub async fn handle_failure(&mut self, reason: &str) {
        let now = self.clock.now();
        self.failures_this_cycle += 1;
        let tripped = self.breaker.record_failure(now);
        warn!(
            "Failure recorded ({} consecutive, breaker {}): {}",
            self.breaker.consecutive_failures(),
            self.breaker.state().as_str(),
            reason
        );
        if tripped {
            let message = format!(
                "Circuit breaker opened after {} consecutive failures. Last error: {}",
                self.breaker.consecutive_failures(),
                reason
            );
            self.create_alert(AlertType::SystemInstability, message, Severity::Critical)
                .await;
        }
    }

    fn note_persistence_warning(&mut self, error: PersistError) {
        warn!("Persistence warning: {}", error);
        self.persistence_warnings.push(error.to_string());
    }

    fn prune_alert_history(&mut self) {
        let cap = self.monitor.max_alert_history;
        if self.alert_history.len() <= cap {
            return;
        }
        let mut excess = self.alert_history.len() - cap;
        self.alert_history.retain(|a| {
            if excess > 0 && !a.is_pending() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests;
