use std::sync::Arc;

use super::*;
use crate::core::alert::{AlertStatus, Severity};
use crate::core::breaker::CircuitState;
use crate::core::tracking::CampaignStatus;

#[tokio::test]
async fn short_generation_raises_insufficient_variants() {
    let tmp_out = tempfile::tempdir().unwrap();
    let mut h = harness(
        Arc::new(ReportPipeline {
            variants: 2,
            cost: 1.2,
            output_root: output_root(tmp_out.path()),
        }),
        Arc::new(FixedLedger(0.0)),
        |_| {},
    );
    write_brief(h.briefs_dir(), "spring_launch", &["Sneaker", "Backpack"]);

    h.agent.run_iteration().await;

    let entry = &h.agent.get_campaign_tracking()["spring_launch"];
    assert_eq!(entry.status(), CampaignStatus::Completed);
    assert_eq!(entry.variants_generated, 2);
    assert_eq!(entry.target_variants, 6);
    assert!(entry.generation_completed.is_some());

    let alerts = h.alerts_of(AlertType::InsufficientVariants);
    assert_eq!(alerts.len(), 1);
    let alert = alerts[0];
    assert_eq!(alert.severity, Severity::Medium);
    assert!(alert.message.contains("spring_launch"));
    assert_eq!(alert.status(), AlertStatus::Processed);

    let store = h.agent.alert_store();
    assert!(store.alert_path(&alert.id).exists());
    assert!(store.communication_path(&alert.id).exists());
    let email = std::fs::read_to_string(store.email_path(&alert.id)).unwrap();
    assert!(email.starts_with("Subject: [MEDIUM] Creative Automation Alert: insufficient_variants"));
    assert!(email.contains("Completed campaigns: 1"));
}

#[tokio::test]
async fn cost_over_threshold_raises_one_cost_spike() {
    let mut h = harness(Arc::new(FailingPipeline), Arc::new(FixedLedger(75.0)), |_| {});

    h.agent.run_iteration().await;

    let spikes = h.alerts_of(AlertType::CostSpike);
    assert_eq!(spikes.len(), 1);
    assert_eq!(spikes[0].severity, Severity::High);
    assert!(spikes[0].message.contains("$75.00"));
    assert!(spikes[0].message.contains("$50.00"));
    assert_eq!(h.agent.get_alert_history().len(), 1);
}

#[tokio::test]
async fn five_failed_campaigns_open_the_breaker_once() {
    let mut h = harness(Arc::new(FailingPipeline), Arc::new(FixedLedger(0.0)), |_| {});
    for id in ["c1", "c2", "c3", "c4", "c5"] {
        write_brief(h.briefs_dir(), id, &["Sneaker"]);
    }

    h.agent.run_iteration().await;

    assert_eq!(h.agent.circuit_breaker().state(), CircuitState::Open);
    assert_eq!(h.alerts_of(AlertType::GenerationFailure).len(), 5);
    let instability = h.alerts_of(AlertType::SystemInstability);
    assert_eq!(instability.len(), 1);
    assert_eq!(instability[0].severity, Severity::Critical);
    assert_eq!(h.agent.get_status().campaigns.failed, 5);

    h.agent.run_iteration().await;
    assert_eq!(h.alerts_of(AlertType::SystemInstability).len(), 1);
    assert_eq!(h.agent.circuit_breaker().state(), CircuitState::Open);
}

#[tokio::test]
async fn manual_test_alert_is_processed_and_logged() {
    let mut h = harness(Arc::new(FailingPipeline), Arc::new(FixedLedger(0.0)), |_| {});

    let alert = h
        .agent
        .create_alert("test_alert", "Integration check from operator", Severity::Medium)
        .await;
    assert_eq!(alert.alert_type, AlertType::TestAlert);
    assert!(alert.is_pending());

    let summary = h.agent.process_alerts().await;
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);

    let stored = &h.agent.get_alert_history()[0];
    assert_eq!(stored.status(), AlertStatus::Processed);
    assert!(stored.processed_at().is_some());

    let store = h.agent.alert_store();
    let email = std::fs::read_to_string(store.email_path(&alert.id)).unwrap();
    assert!(email.contains("Integration check from operator"));
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.communication_path(&alert.id)).unwrap())
            .unwrap();
    assert_eq!(record["alert_id"], alert.id.as_str());
    assert_eq!(record["rendered_by"], "fallback");
    assert!(record["context"]["recommended_actions"].is_array());

    assert_eq!(h.agent.process_alerts().await.processed, 0);
}

#[tokio::test]
async fn alert_ids_are_unique_and_sequenced() {
    let mut h = harness(Arc::new(FailingPipeline), Arc::new(FixedLedger(0.0)), |_| {});
    let a = h.agent.create_alert("custom_check", "one", Severity::Low).await;
    let b = h.agent.create_alert("custom_check", "two", Severity::Low).await;
    assert_ne!(a.id, b.id);
    assert!(a.id.starts_with("alert_1_"));
    assert!(b.id.starts_with("alert_2_"));
    assert_eq!(a.alert_type, AlertType::Custom("custom_check".into()));
}
