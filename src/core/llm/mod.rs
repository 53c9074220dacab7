mod openai;

pub use openai::OpenAiCompatibleProvider;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::core::config::LlmSettings;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    // Execute a prompt against the configured model using a structured conversation
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Builds the provider from settings. Returns `None` when no API key is available,
/// in which case every communication uses the fallback template.
pub fn provider_from_settings(settings: &LlmSettings) -> Option<Arc<dyn LlmProvider>> {
    if !settings.enabled {
        info!("Language-model rendering disabled; using fallback communications.");
        return None;
    }
    let key = std::env::var(&settings.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());
    match key {
        Some(api_key) => {
            info!(
                "Registered LLM Provider: {} ({})",
                settings.base_url, settings.model
            );
            Some(Arc::new(OpenAiCompatibleProvider::new(
                settings.base_url.clone(),
                settings.model.clone(),
                api_key,
            )))
        }
        None => {
            info!(
                "{} not set; stakeholder communications will use the fallback template.",
                settings.api_key_env
            );
            None
        }
    }
}
