use chrono::{DateTime, Utc};
use tracing::info;

use super::CreativeAutomationAgent;
use crate::core::config::{
    COST_THRESHOLD_CEILING, COST_THRESHOLD_FLOOR, SUCCESS_RATE_CEILING, SUCCESS_RATE_FLOOR,
};
use crate::core::tracking::CampaignStatus;

/// Fewer recent campaigns than this and the thresholds are left alone.
const MIN_SAMPLE: usize = 3;
const SUCCESS_MARGIN: f64 = 0.05;
const SUCCESS_MIN_STEP: f64 = 0.01;
const COST_HEADROOM: f64 = 1.5;
const COST_MIN_STEP: f64 = 10.0;

/// New success-rate threshold for an observed rate, or `None` when the move would be
/// too small to matter. The result always lies in the allowed band.
pub fn adapted_success_threshold(current: f64, recent_rate: f64) -> Option<f64> {
    if !recent_rate.is_finite() {
        return None;
    }
    let target = (recent_rate - SUCCESS_MARGIN).clamp(SUCCESS_RATE_FLOOR, SUCCESS_RATE_CEILING);
    ((target - current).abs() >= SUCCESS_MIN_STEP).then_some(target)
}

pub fn adapted_cost_threshold(current: f64, average_cost: f64) -> Option<f64> {
    if !average_cost.is_finite() || average_cost <= 0.0 {
        return None;
    }
    let target = (average_cost * COST_HEADROOM).clamp(COST_THRESHOLD_FLOOR, COST_THRESHOLD_CEILING);
    ((target - current).abs() > COST_MIN_STEP).then_some(target)
}

impl CreativeAutomationAgent {
    pub(crate) fn recalculate_thresholds(&mut self, now: DateTime<Utc>) {
        let since = now - chrono::Duration::hours(i64::from(self.config.performance_history_window));
        let (sample, completed, failed, costs) = {
            let recent = self.tracker.detected_since(since);
            let completed = recent
                .iter()
                .filter(|e| e.status() == CampaignStatus::Completed)
                .count();
            let failed = recent
                .iter()
                .filter(|e| e.status() == CampaignStatus::Failed)
                .count();
            let costs: Vec<f64> = recent
                .iter()
                .filter(|e| e.status() == CampaignStatus::Completed && e.api_cost > 0.0)
                .map(|e| e.api_cost)
                .collect();
            (recent.len(), completed, failed, costs)
        };
        if sample < MIN_SAMPLE {
            return;
        }

        if completed + failed > 0 {
            let rate = completed as f64 / (completed + failed) as f64;
            if let Some(next) = adapted_success_threshold(self.config.success_rate_threshold, rate)
            {
                info!(
                    "Adaptive success-rate threshold {:.2} -> {:.2} (recent rate {:.2})",
                    self.config.success_rate_threshold, next, rate
                );
                self.config.success_rate_threshold = next;
            }
        }

        if !costs.is_empty() {
            let average = costs.iter().sum::<f64>() / costs.len() as f64;
            if let Some(next) = adapted_cost_threshold(self.config.cost_alert_threshold, average) {
                info!(
                    "Adaptive cost threshold ${:.2} -> ${:.2} (average campaign cost ${:.2})",
                    self.config.cost_alert_threshold, next, average
                );
                self.config.cost_alert_threshold = next;
            }
        }
    }
}
