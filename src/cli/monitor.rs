use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::info;

use super::{AlertCommandArgs, GlobalFlags};
use crate::core::agent::{AgentStatus, Collaborators, CreativeAutomationAgent, MonitorHandle};
use crate::core::config::AgentSettings;
use crate::core::terminal::{self, GuideSection};
use crate::logging;

async fn build_agent(globals: &GlobalFlags) -> Result<(CreativeAutomationAgent, AgentSettings)> {
    let settings = AgentSettings::load(&globals.config).await?;
    if let Some(problem) = logging::init(&settings.paths.logs_dir, globals.verbose, globals.quiet)
    {
        terminal::print_warn(&format!("File logging disabled: {}", problem));
    }
    info!("Agent config: {}", globals.config.display());
    let agent = CreativeAutomationAgent::new(&settings, Collaborators::from_settings(&settings));
    Ok((agent, settings))
}

fn stop_on_ctrl_c(handle: MonitorHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received");
            handle.stop();
        }
    });
}

fn print_startup(settings: &AgentSettings, agent: &CreativeAutomationAgent) {
    terminal::print_banner();
    GuideSection::new("Monitoring")
        .status("Briefs", &settings.paths.briefs_dir.display().to_string())
        .status("Outputs", &settings.paths.output_dir.display().to_string())
        .status("Alerts", &settings.paths.alerts_dir.display().to_string())
        .status(
            "Interval",
            &format!("{}s", settings.monitor.check_interval_secs),
        )
        .status(
            "Generation",
            settings
                .generation
                .command
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or("not configured"),
        )
        .status(
            "Stakeholder emails",
            if agent.get_status().language_model {
                "language model"
            } else {
                "fallback template"
            },
        )
        .blank()
        .text("Press Ctrl+C to stop.")
        .print();
    println!();
}

fn print_status_summary(status: &AgentStatus) {
    let c = &status.campaigns;
    GuideSection::new("Agent Status")
        .status(
            "Campaigns",
            &format!(
                "{} tracked ({} generating, {} completed, {} failed)",
                status.tracked_campaigns, c.generating, c.completed, c.failed
            ),
        )
        .status(
            "Alerts",
            &format!(
                "{} total, {} pending",
                status.total_alerts, status.pending_alerts
            ),
        )
        .status(
            "Circuit breaker",
            &format!(
                "{} ({} consecutive failures)",
                status.circuit_breaker.state().as_str(),
                status.circuit_breaker.consecutive_failures()
            ),
        )
        .status(
            "Thresholds",
            &format!(
                "success >= {:.0}%, cost <= ${:.2}",
                status.thresholds.success_rate_threshold * 100.0,
                status.thresholds.cost_alert_threshold
            ),
        )
        .status(
            "Persistence warnings",
            &status.persistence_warnings.to_string(),
        )
        .print();
}

pub(super) async fn run_monitor(globals: &GlobalFlags) -> Result<()> {
    let (mut agent, settings) = build_agent(globals).await?;
    if !globals.quiet {
        print_startup(&settings, &agent);
    }
    stop_on_ctrl_c(agent.monitor_handle());
    agent.start_monitoring().await;

    if !globals.quiet {
        print_status_summary(&agent.get_status());
        terminal::print_goodbye();
    }
    Ok(())
}

pub(super) async fn run_bounded(globals: &GlobalFlags, duration: Duration) -> Result<()> {
    let (mut agent, settings) = build_agent(globals).await?;
    if !globals.quiet {
        print_startup(&settings, &agent);
        terminal::print_info(&format!(
            "Running for {} minute(s)",
            duration.as_secs_f64() / 60.0
        ));
    }
    stop_on_ctrl_c(agent.monitor_handle());
    let status = agent.run_agent_monitor(duration).await;

    if !globals.quiet {
        print_status_summary(&status);
    }
    Ok(())
}

pub(super) async fn run_check(globals: &GlobalFlags) -> Result<()> {
    let (mut agent, _) = build_agent(globals).await?;
    let status = agent.run_once().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub(super) async fn run_alert(globals: &GlobalFlags, args: AlertCommandArgs) -> Result<()> {
    let (mut agent, _) = build_agent(globals).await?;
    let alert = agent
        .create_alert(args.alert_type.as_str(), args.message, args.severity)
        .await;
    let summary = agent.process_alerts().await;
    if summary.processed == 0 {
        return Err(anyhow!(
            "alert {} was raised but its communication could not be logged: {}",
            alert.id,
            agent.persistence_warnings().join("; ")
        ));
    }

    let store = agent.alert_store();
    terminal::print_success(&format!("Alert {} processed", alert.id));
    terminal::print_status("Alert", &store.alert_path(&alert.id).display().to_string());
    terminal::print_status(
        "Communication",
        &store.communication_path(&alert.id).display().to_string(),
    );
    terminal::print_status("Email", &store.email_path(&alert.id).display().to_string());
    Ok(())
}
