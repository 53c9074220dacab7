pub mod context;

pub use context::{BusinessContext, CampaignOverview, ContextInputs, build_context};

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::alert::Alert;
use crate::core::llm::{ChatMessage, LlmProvider};

const SYSTEM_PROMPT: &str = "You are the operations lead for a creative automation pipeline. \
Write a concise, professional status email for business stakeholders. Lead with the impact, \
state the urgency and response expectation, list the recommended actions, and avoid jargon.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderSource {
    LanguageModel,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Communication {
    pub text: String,
    pub source: RenderSource,
}

/// Turns an alert plus its business context into stakeholder-facing text.
pub struct StakeholderCommunicator {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl StakeholderCommunicator {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub fn has_language_model(&self) -> bool {
        self.llm.is_some()
    }

    /// Never fails: any language-model problem degrades to [`fallback_message`].
    pub async fn render(&self, alert: &Alert, context: &BusinessContext) -> Communication {
        if let Some(llm) = &self.llm {
            match self.render_via_language_model(llm.as_ref(), context).await {
                Ok(text) => {
                    return Communication {
                        text,
                        source: RenderSource::LanguageModel,
                    };
                }
                Err(e) => warn!(
                    "Language-model rendering failed for {}, using fallback: {}",
                    alert.id, e
                ),
            }
        }
        Communication {
            text: fallback_message(alert, &context.campaigns),
            source: RenderSource::Fallback,
        }
    }

    async fn render_via_language_model(
        &self,
        llm: &dyn LlmProvider,
        context: &BusinessContext,
    ) -> Result<String> {
        let prompt = build_prompt(context)?;
        debug!("Requesting stakeholder communication from {}", llm.name());
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let reply = tokio::time::timeout(self.timeout, llm.generate(&messages))
            .await
            .map_err(|_| anyhow!("language model timed out after {:?}", self.timeout))??;
        let text = reply.trim();
        if text.is_empty() {
            return Err(anyhow!("language model returned an empty reply"));
        }
        Ok(text.to_string())
    }
}

pub fn build_prompt(context: &BusinessContext) -> Result<String> {
    let payload = serde_json::to_string_pretty(context)?;
    Ok(format!(
        "An alert was raised by the creative automation monitor.\n\n\
         Business context (JSON):\n{}\n\n\
         Write the stakeholder email. Include a subject line, a one-paragraph summary, \
         the business impact (delay of {} hours, ${:.0} revenue at risk), the urgency \
         ({}: {}), and the recommended actions as a bulleted list.",
        payload,
        context.impact.estimated_delay_hours,
        context.impact.revenue_at_risk,
        context.urgency.level.as_str(),
        context.urgency.response_sla,
    ))
}

/// Deterministic communication used whenever the language model is unavailable.
pub fn fallback_message(alert: &Alert, campaigns: &CampaignOverview) -> String {
    let severity = alert.severity.as_str().to_uppercase();
    format!(
        "Subject: [{severity}] Creative Automation Alert: {kind}\n\
         \n\
         Alert Details:\n\
         - Severity: {severity}\n\
         - Type: {kind}\n\
         - Time: {time}\n\
         - Message: {message}\n\
         \n\
         Current Status:\n\
         - Active campaigns: {active}\n\
         - Completed campaigns: {completed}\n\
         - Failed campaigns: {failed}\n\
         \n\
         Next update in 1 hour.\n",
        severity = severity,
        kind = alert.alert_type,
        time = alert.timestamp.to_rfc3339(),
        message = alert.message,
        active = campaigns.active,
        completed = campaigns.completed,
        failed = campaigns.failed,
    )
}
