use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use super::CreativeAutomationAgent;
use crate::core::alert::{AlertType, Severity};
use crate::core::breaker::CircuitState;
use crate::core::tracking::CampaignStatus;

impl CreativeAutomationAgent {
    /// Cost, queue and success-rate checks. Each runs independently; a ledger read
    /// error is reported only after the other two have run.
    pub(crate) async fn monitor_system_health(&mut self) -> Result<()> {
        let today = self.clock.now().date_naive();
        let cost = self.ledger.total_cost_for_day(today).await;

        let counts = self.tracker.counts();
        if counts.generating > self.config.max_queue_length {
            self.create_alert(
                AlertType::QueueOverload,
                format!(
                    "Generation queue has {} campaigns in progress (limit {})",
                    counts.generating, self.config.max_queue_length
                ),
                Severity::Medium,
            )
            .await;
        }

        if let Some(rate) = counts.success_rate() {
            if rate < self.config.success_rate_threshold {
                self.create_alert(
                    AlertType::LowSuccessRate,
                    format!(
                        "Success rate {:.1}% is below the {:.1}% threshold ({} completed, {} failed)",
                        rate * 100.0,
                        self.config.success_rate_threshold * 100.0,
                        counts.completed,
                        counts.failed
                    ),
                    Severity::High,
                )
                .await;
            }
        }

        let total_cost = cost.context("reading today's generation cost")?;
        self.last_total_cost = total_cost;
        if total_cost > self.config.cost_alert_threshold {
            self.create_alert(
                AlertType::CostSpike,
                format!(
                    "Today's generation cost ${:.2} exceeds the ${:.2} threshold",
                    total_cost, self.config.cost_alert_threshold
                ),
                Severity::High,
            )
            .await;
        }
        Ok(())
    }

    /// Re-scans the output tree of every campaign that has not completed. Running it
    /// twice over an unchanged tree leaves the tracking entries identical.
    pub(crate) async fn track_variants(&mut self) -> Result<()> {
        let targets: Vec<(String, PathBuf)> = self
            .tracker
            .entries()
            .filter(|e| e.status() != CampaignStatus::Completed)
            .map(|e| {
                let dir = e
                    .output_path
                    .clone()
                    .unwrap_or_else(|| self.output_root.join(&e.campaign_id));
                (e.campaign_id.clone(), dir)
            })
            .collect();

        for (campaign_id, dir) in targets {
            let is_dir = tokio::fs::metadata(&dir)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            let tree = self
                .outputs
                .list_output_files(&dir)
                .await
                .with_context(|| format!("listing outputs for {}", campaign_id))?;
            let variants = tree.variant_count();

            if let Some(entry) = self.tracker.get_mut(&campaign_id) {
                entry.variants_generated = variants;
                entry.products_processed = tree.products().len() as u32;
                entry.aspect_ratios_covered = tree.aspect_ratios();
                entry.refresh_diversity();
                debug!(
                    "Campaign {}: {} variant(s), diversity {}",
                    campaign_id, variants, entry.diversity_score
                );
            }

            if variants < self.config.min_variants_threshold {
                if self.monitor.dedupe_variant_alerts
                    && !self.variant_alerted.insert(campaign_id.clone())
                {
                    continue;
                }
                self.create_alert(
                    AlertType::InsufficientVariants,
                    format!(
                        "Campaign {} has only {} variants on disk (minimum {})",
                        campaign_id, variants, self.config.min_variants_threshold
                    ),
                    Severity::Medium,
                )
                .await;
            }
        }
        Ok(())
    }

    /// Breaker cooldown, adaptive thresholds and history pruning. Never fails.
    pub(crate) fn error_recovery(&mut self) {
        let now = self.clock.now();
        if self.breaker.check_recovery(now) {
            info!("Circuit breaker half-open, running self-test");
        }
        if self.breaker.state() == CircuitState::HalfOpen && self.self_test() {
            self.breaker.reset();
            info!("Self-test passed, circuit breaker closed");
        }

        if self.config.adaptive_thresholds {
            self.recalculate_thresholds(now);
        }
        self.prune_alert_history();
    }

    /// Internal consistency check: every tracked campaign is counted exactly once and
    /// the alert history holds no duplicate ids.
    fn self_test(&self) -> bool {
        let counted = self.tracker.counts().total() == self.tracker.len();
        let mut ids = std::collections::HashSet::new();
        let unique = self.alert_history.iter().all(|a| ids.insert(a.id.as_str()));
        counted && unique
    }
}
