use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const SUCCESS_RATE_FLOOR: f64 = 0.6;
pub const SUCCESS_RATE_CEILING: f64 = 0.95;
pub const COST_THRESHOLD_FLOOR: f64 = 10.0;
pub const COST_THRESHOLD_CEILING: f64 = 10_000.0;

/// Alerting thresholds. Mutated at runtime only by adaptive recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub min_variants_threshold: u32,
    pub cost_alert_threshold: f64,
    pub success_rate_threshold: f64,
    pub max_queue_length: usize,
    pub adaptive_thresholds: bool,
    /// Hours of history considered by adaptive recalculation.
    pub performance_history_window: u32,
    pub circuit_breaker_threshold: u32,
    /// Seconds the breaker stays open before probing.
    pub recovery_timeout: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            min_variants_threshold: 3,
            cost_alert_threshold: 50.0,
            success_rate_threshold: 0.8,
            max_queue_length: 10,
            adaptive_thresholds: true,
            performance_history_window: 24,
            circuit_breaker_threshold: 5,
            recovery_timeout: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub briefs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub alerts_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub cost_ledger: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            briefs_dir: PathBuf::from("campaign_briefs"),
            output_dir: PathBuf::from("output"),
            alerts_dir: PathBuf::from("alerts"),
            logs_dir: PathBuf::from("logs"),
            cost_ledger: PathBuf::from("costs.json"),
        }
    }
}

impl PathSettings {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.briefs_dir,
            &mut self.output_dir,
            &mut self.alerts_dir,
            &mut self.logs_dir,
            &mut self.cost_ledger,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub check_interval_secs: u64,
    pub error_backoff_secs: u64,
    /// 0 leaves the generation call unbounded.
    pub generation_timeout_secs: u64,
    /// Raise `insufficient_variants` from the periodic re-scan only once per campaign.
    pub dedupe_variant_alerts: bool,
    pub max_alert_history: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            error_backoff_secs: 5,
            generation_timeout_secs: 0,
            dedupe_variant_alerts: false,
            max_alert_history: 1000,
        }
    }
}

impl MonitorSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        (self.generation_timeout_secs > 0).then(|| Duration::from_secs(self.generation_timeout_secs))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Everything read from `agent.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub thresholds: AgentConfig,
    pub paths: PathSettings,
    pub monitor: MonitorSettings,
    pub generation: GenerationSettings,
    pub llm: LlmSettings,
}

impl AgentSettings {
    /// Loads settings from `config_path`. A missing file yields defaults. Relative paths
    /// resolve against the config file's directory.
    pub async fn load(config_path: &Path) -> Result<Self> {
        let base = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut settings = if config_path.exists() {
            let content = tokio::fs::read_to_string(config_path)
                .await
                .with_context(|| format!("reading {}", config_path.display()))?;
            let parsed: AgentSettings = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            info!("Loaded agent config from {}", config_path.display());
            parsed
        } else {
            info!(
                "No {} found, using default agent settings.",
                config_path.display()
            );
            AgentSettings::default()
        };

        settings.paths.resolve_against(&base);
        settings.sanitize();
        Ok(settings)
    }

    pub fn sanitize(&mut self) {
        let t = &mut self.thresholds;
        t.success_rate_threshold = t
            .success_rate_threshold
            .clamp(SUCCESS_RATE_FLOOR, SUCCESS_RATE_CEILING);
        t.circuit_breaker_threshold = t.circuit_breaker_threshold.max(1);
        if !t.cost_alert_threshold.is_finite() || t.cost_alert_threshold < 0.0 {
            t.cost_alert_threshold = AgentConfig::default().cost_alert_threshold;
        }
        self.monitor.check_interval_secs = self.monitor.check_interval_secs.max(1);
        self.monitor.max_alert_history = self.monitor.max_alert_history.max(1);
    }
}
