use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::CreativeAutomationAgent;
use crate::core::alert::{AlertType, Severity};
use crate::core::brief::{CampaignBrief, DiscoveredBrief};
use crate::core::pipeline::{GenerationError, GenerationReport, GenerationRequest};
use crate::core::tracking::{CampaignStatus, CampaignTrackingEntry};

impl CreativeAutomationAgent {
    /// Registers unseen briefs and drives generation for each. A brief that fails to
    /// parse raises one `generation_failure` alert and is not retried.
    pub(crate) async fn check_new_briefs(&mut self) -> Result<()> {
        let mut known: HashSet<String> = self.tracker.ids().cloned().collect();
        known.extend(self.rejected_briefs.iter().cloned());

        let discovered = self.briefs.list_new_briefs(&known).await?;
        for DiscoveredBrief {
            campaign_id,
            path,
            parsed,
        } in discovered
        {
            match parsed {
                Ok(brief) => {
                    info!(
                        "New campaign brief detected: {} ({})",
                        campaign_id,
                        path.display()
                    );
                    self.tracker.insert(CampaignTrackingEntry::new(
                        campaign_id.clone(),
                        path.clone(),
                        self.clock.now(),
                    ));
                    self.trigger_generation(&campaign_id, brief, path).await;
                }
                Err(e) => {
                    warn!("Rejected campaign brief {}: {}", path.display(), e);
                    self.rejected_briefs.insert(campaign_id.clone());
                    self.create_alert(
                        AlertType::GenerationFailure,
                        format!("Failed to parse campaign brief {}: {}", campaign_id, e),
                        Severity::High,
                    )
                    .await;
                }
            }
        }
        Ok(())
    }

    /// Runs generation for one tracked campaign and records the outcome. Failures are
    /// absorbed here: the campaign goes to `failed`, an alert is raised and the breaker
    /// counts it.
    pub async fn trigger_generation(
        &mut self,
        campaign_id: &str,
        brief: CampaignBrief,
        brief_path: PathBuf,
    ) {
        let started = self.clock.now();
        if let Some(entry) = self.tracker.get_mut(campaign_id) {
            entry.target_variants = brief.expected_variants();
            entry.advance(CampaignStatus::Generating);
            entry.generation_started = Some(started);
        }
        info!("Starting generation for campaign {}", campaign_id);

        let request = GenerationRequest {
            campaign_id: campaign_id.to_string(),
            brief_path,
            brief,
        };

        match self.dispatch_generation(request).await {
            Ok(report) => self.record_generation(campaign_id, report).await,
            Err(e) => {
                if let Some(entry) = self.tracker.get_mut(campaign_id) {
                    entry.advance(CampaignStatus::Failed);
                }
                let reason = format!("Campaign {} generation failed: {:#}", campaign_id, e);
                self.create_alert(AlertType::GenerationFailure, reason.clone(), Severity::High)
                    .await;
                self.handle_failure(&reason).await;
            }
        }
    }

    async fn record_generation(&mut self, campaign_id: &str, report: GenerationReport) {
        let completed = self.clock.now();
        let min = self.config.min_variants_threshold;
        let target = match self.tracker.get_mut(campaign_id) {
            Some(entry) => {
                entry.advance(CampaignStatus::Completed);
                entry.variants_generated = report.variants_generated;
                entry.api_cost = report.total_cost;
                entry.output_path = Some(report.output_path.clone());
                entry.generation_completed = Some(completed);
                entry.target_variants
            }
            None => 0,
        };
        info!(
            "Campaign {} completed: {} variant(s) in {} (cost ${:.2})",
            campaign_id,
            report.variants_generated,
            report.output_path.display(),
            report.total_cost
        );

        if report.variants_generated < min {
            self.create_alert(
                AlertType::InsufficientVariants,
                format!(
                    "Campaign {} generated only {} variants (minimum {}, expected {})",
                    campaign_id, report.variants_generated, min, target
                ),
                Severity::Medium,
            )
            .await;
        }
    }

    /// The pipeline runs in its own task so a panicking or hung generation cannot take
    /// the loop down with it.
    async fn dispatch_generation(&self, request: GenerationRequest) -> Result<GenerationReport> {
        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::spawn(async move { pipeline.run(&request).await });
        let abort = task.abort_handle();

        let joined = match self.monitor.generation_timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(GenerationError::TimedOut(limit.as_secs()).into());
                }
            },
            None => task.await,
        };
        joined.map_err(|e| GenerationError::Aborted(e.to_string()))?
    }
}
