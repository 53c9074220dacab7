use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{GenerationError, GenerationPipeline, GenerationReport, GenerationRequest};
use crate::platform::{NativePlatform, Platform};

/// Drives an external generation script through the platform shell.
///
/// `{brief}` and `{campaign}` in the template are substituted before launch. The last
/// non-empty stdout line must be a JSON [`GenerationReport`].
pub struct CommandPipeline {
    template: Option<String>,
}

impl CommandPipeline {
    pub fn new(template: Option<String>) -> Self {
        Self {
            template: template.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn render_command(&self, request: &GenerationRequest) -> Option<String> {
        self.template.as_ref().map(|t| {
            t.replace(
                "{brief}",
                &NativePlatform::quote_arg(&request.brief_path.to_string_lossy()),
            )
            .replace("{campaign}", &NativePlatform::quote_arg(&request.campaign_id))
        })
    }
}

pub(super) fn parse_report(stdout: &str) -> Result<GenerationReport, GenerationError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(GenerationError::MissingReport)?;
    serde_json::from_str(line).map_err(GenerationError::BadReport)
}

#[async_trait]
impl GenerationPipeline for CommandPipeline {
    async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        let command = self
            .render_command(request)
            .ok_or(GenerationError::NotConfigured)?;
        info!(
            "Running generation for campaign [{}]: {}",
            request.campaign_id, command
        );

        let output = NativePlatform::shell_inline(&command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(GenerationError::Spawn)?;

        if !output.status.success() {
            return Err(GenerationError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Generation stdout for [{}]: {}", request.campaign_id, stdout);
        Ok(parse_report(&stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::brief::{CampaignBrief, ProductSpec};
    use std::path::PathBuf;

    fn request() -> GenerationRequest {
        GenerationRequest {
            campaign_id: "spring".to_string(),
            brief_path: PathBuf::from("/tmp/briefs/spring.yaml"),
            brief: CampaignBrief {
                campaign_name: None,
                products: vec![ProductSpec::Name("shoe".into())],
                aspect_ratios: vec!["1:1".into()],
                target_region: None,
                target_audience: None,
                campaign_message: None,
            },
        }
    }

    #[test]
    fn report_is_read_from_last_non_empty_line() {
        let stdout = "progress 10%\nprogress 100%\n{\"variants_generated\": 4, \"output_path\": \"out/spring\", \"total_cost\": 1.25}\n\n";
        let report = parse_report(stdout).unwrap();
        assert_eq!(report.variants_generated, 4);
        assert_eq!(report.total_cost, 1.25);
    }

    #[test]
    fn empty_stdout_is_missing_report() {
        assert!(matches!(parse_report("  \n"), Err(GenerationError::MissingReport)));
    }

    #[test]
    fn template_substitutes_quoted_placeholders() {
        let pipeline = CommandPipeline::new(Some("gen --brief {brief} --id {campaign}".into()));
        assert_eq!(
            pipeline.render_command(&request()).unwrap(),
            "gen --brief '/tmp/briefs/spring.yaml' --id 'spring'"
        );
    }

    #[tokio::test]
    async fn blank_template_is_not_configured() {
        let pipeline = CommandPipeline::new(Some("   ".into()));
        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::NotConfigured)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_shell_command_and_parses_report() {
        let pipeline = CommandPipeline::new(Some(
            r#"echo '{"variants_generated": 3, "output_path": "out/x", "total_cost": 0.5}'"#.into(),
        ));
        let report = pipeline.run(&request()).await.unwrap();
        assert_eq!(report.variants_generated, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let pipeline = CommandPipeline::new(Some("echo quota exceeded >&2; exit 3".into()));
        let err = pipeline.run(&request()).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
