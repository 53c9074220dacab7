mod store;

pub use store::{AlertStore, PersistError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertType {
    GenerationFailure,
    InsufficientVariants,
    CostSpike,
    QueueOverload,
    LowSuccessRate,
    SystemInstability,
    TestAlert,
    Custom(String),
}

impl AlertType {
    pub fn as_str(&self) -> &str {
        match self {
            AlertType::GenerationFailure => "generation_failure",
            AlertType::InsufficientVariants => "insufficient_variants",
            AlertType::CostSpike => "cost_spike",
            AlertType::QueueOverload => "queue_overload",
            AlertType::LowSuccessRate => "low_success_rate",
            AlertType::SystemInstability => "system_instability",
            AlertType::TestAlert => "test_alert",
            AlertType::Custom(tag) => tag,
        }
    }
}

impl From<&str> for AlertType {
    fn from(value: &str) -> Self {
        match value {
            "generation_failure" => AlertType::GenerationFailure,
            "insufficient_variants" => AlertType::InsufficientVariants,
            "cost_spike" => AlertType::CostSpike,
            "queue_overload" => AlertType::QueueOverload,
            "low_success_rate" => AlertType::LowSuccessRate,
            "system_instability" => AlertType::SystemInstability,
            "test_alert" => AlertType::TestAlert,
            other => AlertType::Custom(other.to_string()),
        }
    }
}

impl From<String> for AlertType {
    fn from(value: String) -> Self {
        AlertType::from(value.as_str())
    }
}

impl From<AlertType> for String {
    fn from(value: AlertType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Base urgency score used by the business-context builder.
    pub fn score(self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{}' (expected low, medium, high or critical)",
                other
            )),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Processed,
}

/// A single alert raised by one of the agent's detectors.
///
/// Everything except the processing status is fixed at creation. Status moves
/// `pending -> processed` once and only once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processed_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        id: String,
        alert_type: AlertType,
        message: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            alert_type,
            message: message.into(),
            severity,
            timestamp,
            status: AlertStatus::Pending,
            processed_at: None,
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }

    /// Returns false when the alert was already processed; the original
    /// `processed_at` is kept in that case.
    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == AlertStatus::Processed {
            return false;
        }
        self.status = AlertStatus::Processed;
        self.processed_at = Some(at);
        true
    }
}
