use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};

use super::*;
use crate::core::alert::Severity;
use crate::core::clock::Clock;
use crate::core::tracking::{CampaignStatus, CampaignTrackingEntry};

fn seed(
    h: &mut Harness,
    id: &str,
    status: CampaignStatus,
    detected_at: DateTime<Utc>,
    api_cost: f64,
) {
    let mut entry = CampaignTrackingEntry::new(
        id.to_string(),
        h.briefs_dir().join(format!("{}.yaml", id)),
        detected_at,
    );
    if status != CampaignStatus::Detected {
        assert!(entry.advance(CampaignStatus::Generating));
    }
    assert!(entry.advance(status));
    entry.api_cost = api_cost;
    h.agent.tracker.insert(entry);
}

fn quiet_harness(tweak: impl FnOnce(&mut AgentSettings)) -> Harness {
    harness(Arc::new(FailingPipeline), Arc::new(FixedLedger(0.0)), tweak)
}

#[tokio::test]
async fn queue_over_limit_raises_medium_queue_overload() {
    let mut h = quiet_harness(|s| s.thresholds.max_queue_length = 0);
    let now = h.clock.now();
    seed(&mut h, "busy", CampaignStatus::Generating, now, 0.0);

    h.agent.monitor_system_health().await.unwrap();

    let overloads = h.alerts_of(AlertType::QueueOverload);
    assert_eq!(overloads.len(), 1);
    assert_eq!(overloads[0].severity, Severity::Medium);
    assert!(overloads[0].message.contains("1 campaigns in progress"));
}

#[tokio::test]
async fn queue_at_limit_is_not_overloaded() {
    let mut h = quiet_harness(|s| s.thresholds.max_queue_length = 1);
    let now = h.clock.now();
    seed(&mut h, "busy", CampaignStatus::Generating, now, 0.0);

    h.agent.monitor_system_health().await.unwrap();

    assert!(h.alerts_of(AlertType::QueueOverload).is_empty());
}

#[tokio::test]
async fn success_rate_is_skipped_until_something_finishes() {
    let mut h = quiet_harness(|_| {});
    let now = h.clock.now();
    seed(&mut h, "waiting", CampaignStatus::Detected, now, 0.0);
    seed(&mut h, "running", CampaignStatus::Generating, now, 0.0);

    h.agent.monitor_system_health().await.unwrap();

    assert!(h.alerts_of(AlertType::LowSuccessRate).is_empty());
}

#[tokio::test]
async fn success_rate_below_threshold_raises_high_alert() {
    let mut h = quiet_harness(|_| {});
    let now = h.clock.now();
    seed(&mut h, "good", CampaignStatus::Completed, now, 1.0);
    seed(&mut h, "bad", CampaignStatus::Failed, now, 0.0);

    h.agent.monitor_system_health().await.unwrap();

    let low = h.alerts_of(AlertType::LowSuccessRate);
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].severity, Severity::High);
    assert!(low[0].message.contains("50.0%"));
}

#[tokio::test]
async fn success_rate_at_threshold_is_quiet() {
    let mut h = quiet_harness(|s| s.thresholds.success_rate_threshold = 0.75);
    let now = h.clock.now();
    for id in ["a", "b", "c"] {
        seed(&mut h, id, CampaignStatus::Completed, now, 1.0);
    }
    seed(&mut h, "d", CampaignStatus::Failed, now, 0.0);

    h.agent.monitor_system_health().await.unwrap();

    assert!(h.alerts_of(AlertType::LowSuccessRate).is_empty());
}

#[tokio::test]
async fn thresholds_adapt_after_three_recent_campaigns() {
    let mut h = quiet_harness(|_| {});
    let detected = h.clock.now() - ChronoDuration::hours(1);
    for id in ["a", "b", "c"] {
        seed(&mut h, id, CampaignStatus::Completed, detected, 100.0);
    }

    h.agent.recalculate_thresholds(h.clock.now());

    assert_eq!(h.agent.config().success_rate_threshold, 0.95);
    assert_eq!(h.agent.config().cost_alert_threshold, 150.0);
}

#[tokio::test]
async fn thresholds_hold_with_fewer_than_three_recent_campaigns() {
    let mut h = quiet_harness(|_| {});
    let detected = h.clock.now();
    seed(&mut h, "a", CampaignStatus::Completed, detected, 100.0);
    seed(&mut h, "b", CampaignStatus::Completed, detected, 100.0);

    h.agent.recalculate_thresholds(h.clock.now());

    assert_eq!(h.agent.config().success_rate_threshold, 0.8);
    assert_eq!(h.agent.config().cost_alert_threshold, 50.0);
}

#[tokio::test]
async fn campaigns_outside_the_history_window_are_ignored() {
    let mut h = quiet_harness(|s| s.thresholds.performance_history_window = 24);
    let detected = h.clock.now();
    for id in ["a", "b", "c"] {
        seed(&mut h, id, CampaignStatus::Failed, detected, 0.0);
    }

    h.clock.advance(ChronoDuration::hours(24));
    h.agent.recalculate_thresholds(h.clock.now());
    assert_eq!(h.agent.config().success_rate_threshold, 0.6);

    h.agent.config.success_rate_threshold = 0.8;
    h.clock.advance(ChronoDuration::seconds(1));
    h.agent.recalculate_thresholds(h.clock.now());
    assert_eq!(h.agent.config().success_rate_threshold, 0.8);
}

#[tokio::test]
async fn error_recovery_applies_adaptive_thresholds() {
    let mut h = quiet_harness(|_| {});
    let detected = h.clock.now();
    for id in ["a", "b", "c"] {
        seed(&mut h, id, CampaignStatus::Completed, detected, 100.0);
    }

    h.agent.error_recovery();
    assert_eq!(h.agent.config().cost_alert_threshold, 150.0);

    let mut fixed = quiet_harness(|s| s.thresholds.adaptive_thresholds = false);
    for id in ["a", "b", "c"] {
        seed(&mut fixed, id, CampaignStatus::Completed, detected, 100.0);
    }
    fixed.agent.error_recovery();
    assert_eq!(fixed.agent.config().cost_alert_threshold, 50.0);
}

#[tokio::test]
async fn cost_day_follows_the_agent_clock() {
    let ledger = Arc::new(RecordingLedger::default());
    let mut h = harness(Arc::new(FailingPipeline), ledger.clone(), |_| {});

    h.agent.monitor_system_health().await.unwrap();
    h.clock.advance(ChronoDuration::hours(15));
    h.agent.monitor_system_health().await.unwrap();

    assert_eq!(
        *ledger.days.lock().unwrap(),
        vec![
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
        ]
    );
}
