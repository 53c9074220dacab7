use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::alert::{Alert, AlertType, Severity};
use crate::core::config::AgentConfig;
use crate::core::tracking::{CampaignTracker, StatusCounts};

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignProgress {
    pub campaign_id: String,
    pub status: String,
    pub variants_generated: u32,
    pub target_variants: u32,
    pub completion_rate: f64,
    pub diversity_score: u32,
    pub api_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignOverview {
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub success_rate: Option<f64>,
    pub total_variants: u32,
    pub target_variants: u32,
    pub overall_completion_rate: f64,
    pub campaigns: Vec<CampaignProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostOverview {
    pub total_cost: f64,
    pub budget: f64,
    pub utilization_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertDigest {
    pub total_today: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Another alert of the same type was already raised today.
    pub repeated_type: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessImpact {
    pub estimated_delay_hours: f64,
    pub revenue_at_risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrgencyLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "CRITICAL",
            UrgencyLevel::High => "HIGH",
            UrgencyLevel::Medium => "MEDIUM",
            UrgencyLevel::Low => "LOW",
        }
    }

    pub fn response_sla(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "Immediate response required (within 15 minutes)",
            UrgencyLevel::High => "Response required within 1 hour",
            UrgencyLevel::Medium => "Response required within 4 hours",
            UrgencyLevel::Low => "Review during the next business day",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Urgency {
    pub level: UrgencyLevel,
    pub score: u8,
    pub response_sla: String,
}

/// Read-only snapshot of agent state around one alert, handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessContext {
    pub alert: AlertSummary,
    pub campaigns: CampaignOverview,
    pub costs: CostOverview,
    pub alerts_today: AlertDigest,
    pub impact: BusinessImpact,
    pub recommended_actions: Vec<String>,
    pub urgency: Urgency,
    pub generated_at: DateTime<Utc>,
}

/// Inputs the context builder reads; all borrowed from the agent for the duration of one call.
pub struct ContextInputs<'a> {
    pub tracker: &'a CampaignTracker,
    pub history: &'a [Alert],
    pub total_cost: f64,
    pub config: &'a AgentConfig,
    pub now: DateTime<Utc>,
}

pub fn build_context(alert: &Alert, inputs: &ContextInputs<'_>) -> BusinessContext {
    let counts = inputs.tracker.counts();
    let campaigns = campaign_overview(inputs.tracker, counts);
    let costs = cost_overview(inputs.total_cost, inputs.config.cost_alert_threshold);
    let alerts_today = alert_digest(alert, inputs.history, inputs.now);
    let impact = business_impact(&alert.alert_type, inputs.total_cost);
    let recommended_actions =
        recommended_actions(&alert.alert_type, counts.success_rate(), costs.utilization_pct);
    let urgency = urgency(alert, &alerts_today, counts.failed);

    BusinessContext {
        alert: AlertSummary {
            id: alert.id.clone(),
            alert_type: alert.alert_type.to_string(),
            severity: alert.severity,
            message: alert.message.clone(),
            timestamp: alert.timestamp,
        },
        campaigns,
        costs,
        alerts_today,
        impact,
        recommended_actions,
        urgency,
        generated_at: inputs.now,
    }
}

fn campaign_overview(tracker: &CampaignTracker, counts: StatusCounts) -> CampaignOverview {
    let campaigns: Vec<CampaignProgress> = tracker
        .entries()
        .map(|e| CampaignProgress {
            campaign_id: e.campaign_id.clone(),
            status: e.status().as_str().to_string(),
            variants_generated: e.variants_generated,
            target_variants: e.target_variants,
            completion_rate: e.completion_rate(),
            diversity_score: e.diversity_score,
            api_cost: e.api_cost,
        })
        .collect();
    let total_variants: u32 = campaigns.iter().map(|c| c.variants_generated).sum();
    let target_variants: u32 = campaigns.iter().map(|c| c.target_variants).sum();
    let overall_completion_rate = if target_variants == 0 {
        0.0
    } else {
        total_variants as f64 / target_variants as f64
    };

    CampaignOverview {
        active: counts.detected + counts.generating,
        completed: counts.completed,
        failed: counts.failed,
        total: counts.total(),
        success_rate: counts.success_rate(),
        total_variants,
        target_variants,
        overall_completion_rate,
        campaigns,
    }
}

fn cost_overview(total_cost: f64, budget: f64) -> CostOverview {
    let utilization_pct = if budget > 0.0 {
        total_cost / budget * 100.0
    } else {
        0.0
    };
    CostOverview {
        total_cost,
        budget,
        utilization_pct,
    }
}

fn alert_digest(alert: &Alert, history: &[Alert], now: DateTime<Utc>) -> AlertDigest {
    let today = now.date_naive();
    let mut digest = AlertDigest::default();
    for a in history.iter().filter(|a| a.timestamp.date_naive() == today) {
        digest.total_today += 1;
        match a.severity {
            Severity::Critical => digest.critical += 1,
            Severity::High => digest.high += 1,
            Severity::Medium => digest.medium += 1,
            Severity::Low => digest.low += 1,
        }
        if a.id != alert.id && a.alert_type == alert.alert_type && a.timestamp <= alert.timestamp {
            digest.repeated_type = true;
        }
    }
    digest
}

pub fn business_impact(alert_type: &AlertType, total_cost: f64) -> BusinessImpact {
    let (estimated_delay_hours, revenue_at_risk) = match alert_type {
        AlertType::GenerationFailure => (2.0, 25_000.0),
        AlertType::CostSpike => (0.0, total_cost * 10.0),
        AlertType::InsufficientVariants => (1.0, 15_000.0),
        _ => (0.0, 0.0),
    };
    BusinessImpact {
        estimated_delay_hours,
        revenue_at_risk,
    }
}

pub fn recommended_actions(
    alert_type: &AlertType,
    success_rate: Option<f64>,
    cost_utilization_pct: f64,
) -> Vec<String> {
    let base: &[&str] = match alert_type {
        AlertType::GenerationFailure => &[
            "Check image-generation API credentials and remaining quota",
            "Validate the campaign brief for missing or malformed fields",
            "Retry generation once the upstream service responds normally",
        ],
        AlertType::InsufficientVariants => &[
            "Review generation logs for skipped products or aspect ratios",
            "Re-run generation for the missing product/ratio combinations",
            "Confirm the brief lists every required aspect ratio",
        ],
        AlertType::CostSpike => &[
            "Review today's API usage by campaign",
            "Pause non-critical campaigns until spend is understood",
            "Consider cheaper generation settings for remaining work",
        ],
        AlertType::QueueOverload => &[
            "Stagger incoming campaign briefs",
            "Check for generation jobs that appear stuck",
        ],
        AlertType::LowSuccessRate => &[
            "Inspect recent generation failures for a common cause",
            "Check external service status pages",
            "Hold new briefs until the failure cause is resolved",
        ],
        AlertType::SystemInstability => &[
            "Investigate repeated pipeline failures before resuming",
            "Verify network connectivity and API availability",
            "Monitor the circuit breaker for recovery",
        ],
        AlertType::TestAlert | AlertType::Custom(_) => {
            &["Review the alert details and monitor the next cycle"]
        }
    };

    let mut actions: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if success_rate.is_some_and(|r| r < 0.5) {
        actions.push("Escalate to engineering leadership: campaign success rate below 50%".into());
    }
    if cost_utilization_pct > 90.0 {
        actions.push("Notify finance: daily budget utilization above 90%".into());
    }
    actions
}

/// Severity score: base severity (1-4), +1 for more than two critical alerts today,
/// +1 for more than three failed campaigns, +1 for failure and cost alert types.
pub fn urgency(alert: &Alert, digest: &AlertDigest, failed_campaigns: usize) -> Urgency {
    let mut score = alert.severity.score();
    if digest.critical > 2 {
        score += 1;
    }
    if failed_campaigns > 3 {
        score += 1;
    }
    if matches!(
        alert.alert_type,
        AlertType::GenerationFailure | AlertType::CostSpike
    ) {
        score += 1;
    }
    let level = match score {
        s if s >= 5 => UrgencyLevel::Critical,
        4 => UrgencyLevel::High,
        2 | 3 => UrgencyLevel::Medium,
        _ => UrgencyLevel::Low,
    };
    Urgency {
        level,
        score,
        response_sla: level.response_sla().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracking::{CampaignStatus, CampaignTrackingEntry};
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn alert(id: &str, t: AlertType, sev: Severity, at: DateTime<Utc>) -> Alert {
        Alert::new(id.to_string(), t, "m", sev, at)
    }

    fn tracker_with(statuses: &[CampaignStatus]) -> CampaignTracker {
        let mut tracker = CampaignTracker::new();
        for (i, status) in statuses.iter().enumerate() {
            let mut e = CampaignTrackingEntry::new(format!("c{}", i), PathBuf::from("b.yaml"), now());
            e.target_variants = 6;
            e.variants_generated = 3;
            if *status != CampaignStatus::Detected {
                e.advance(CampaignStatus::Generating);
            }
            if status.is_terminal() {
                e.advance(*status);
            }
            tracker.insert(e);
        }
        tracker
    }

    #[test]
    fn impact_table_matches_alert_types() {
        assert_eq!(
            business_impact(&AlertType::GenerationFailure, 5.0),
            BusinessImpact {
                estimated_delay_hours: 2.0,
                revenue_at_risk: 25_000.0
            }
        );
        assert_eq!(business_impact(&AlertType::CostSpike, 75.0).revenue_at_risk, 750.0);
        assert_eq!(
            business_impact(&AlertType::InsufficientVariants, 0.0).estimated_delay_hours,
            1.0
        );
        assert_eq!(
            business_impact(&AlertType::QueueOverload, 99.0),
            BusinessImpact {
                estimated_delay_hours: 0.0,
                revenue_at_risk: 0.0
            }
        );
    }

    #[test]
    fn escalation_lines_are_appended() {
        let plain = recommended_actions(&AlertType::CostSpike, Some(0.9), 50.0);
        let escalated = recommended_actions(&AlertType::CostSpike, Some(0.3), 95.0);
        assert_eq!(escalated.len(), plain.len() + 2);
        assert!(escalated.iter().any(|a| a.contains("success rate below 50%")));
        assert!(escalated.iter().any(|a| a.contains("above 90%")));
    }

    #[test]
    fn urgency_score_compounds() {
        let a = alert("a1", AlertType::GenerationFailure, Severity::High, now());
        let calm = urgency(&a, &AlertDigest::default(), 0);
        assert_eq!(calm.score, 4);
        assert_eq!(calm.level, UrgencyLevel::High);

        let stormy = AlertDigest {
            critical: 3,
            ..Default::default()
        };
        let hot = urgency(&a, &stormy, 4);
        assert_eq!(hot.score, 6);
        assert_eq!(hot.level, UrgencyLevel::Critical);

        let low = alert("a2", AlertType::TestAlert, Severity::Low, now());
        assert_eq!(urgency(&low, &AlertDigest::default(), 0).level, UrgencyLevel::Low);
    }

    #[test]
    fn digest_counts_today_and_flags_repeats() {
        let yesterday = now() - chrono::Duration::days(1);
        let history = vec![
            alert("old", AlertType::CostSpike, Severity::High, yesterday),
            alert("a1", AlertType::CostSpike, Severity::High, now()),
            alert("a2", AlertType::SystemInstability, Severity::Critical, now()),
            alert("a3", AlertType::CostSpike, Severity::High, now()),
        ];
        let digest = alert_digest(&history[3], &history, now());
        assert_eq!(digest.total_today, 3);
        assert_eq!(digest.high, 2);
        assert_eq!(digest.critical, 1);
        assert!(digest.repeated_type);

        let first = alert_digest(&history[2], &history, now());
        assert!(!first.repeated_type);
    }

    #[test]
    fn context_snapshot_reflects_tracker_and_costs() {
        let tracker = tracker_with(&[
            CampaignStatus::Detected,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
        ]);
        let config = AgentConfig::default();
        let a = alert("a1", AlertType::CostSpike, Severity::High, now());
        let history = vec![a.clone()];
        let ctx = build_context(
            &a,
            &ContextInputs {
                tracker: &tracker,
                history: &history,
                total_cost: 25.0,
                config: &config,
                now: now(),
            },
        );
        assert_eq!(ctx.campaigns.active, 1);
        assert_eq!(ctx.campaigns.completed, 1);
        assert_eq!(ctx.campaigns.failed, 1);
        assert_eq!(ctx.campaigns.success_rate, Some(0.5));
        assert_eq!(ctx.campaigns.total_variants, 9);
        assert_eq!(ctx.campaigns.overall_completion_rate, 0.5);
        assert_eq!(ctx.costs.utilization_pct, 50.0);
        assert_eq!(ctx.impact.revenue_at_risk, 250.0);
        assert_eq!(ctx.urgency.level, UrgencyLevel::High);
    }
}
