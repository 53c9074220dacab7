mod monitor;

use anyhow::{Result, anyhow};
use console::style;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::alert::Severity;
use crate::core::terminal::{self, GuideSection};

pub(crate) const DEFAULT_CONFIG: &str = "agent.toml";
pub(crate) const DEFAULT_RUN_MINUTES: f64 = 5.0;

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Monitoring")
        .command("monitor", "Watch briefs and the pipeline until Ctrl+C")
        .command("run", "Monitor for a bounded time (--minutes N, default 5)")
        .command("check", "Run one monitoring cycle and print status JSON")
        .print();

    GuideSection::new("Alerts")
        .command(
            "alert",
            "Raise and process an alert (--type, --message, --severity)",
        )
        .print();

    GuideSection::new("Options")
        .text("--config <path>   Agent config file (default: ./agent.toml)")
        .text("--verbose, -v     Debug-level logging")
        .text("--quiet, -q       Log to logs/agent.log only")
        .blank()
        .hint("creative-agent run --minutes 10")
        .hint("creative-agent alert --type test_alert --severity high --message \"Smoke test\"")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("creative-agent").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlobalFlags {
    pub config: PathBuf,
    pub verbose: bool,
    pub quiet: bool,
}

pub(crate) fn parse_global_flags(args: &[String], start: usize) -> GlobalFlags {
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut verbose = false;
    let mut quiet = false;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config = PathBuf::from(&args[i + 1]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
                i += 1;
            }
            "--quiet" | "-q" => {
                quiet = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    GlobalFlags {
        config,
        verbose,
        quiet,
    }
}

/// First positional argument, skipping global flags and their values. Returns the
/// command and its index in `args`.
pub(crate) fn find_command(args: &[String]) -> Option<(&str, usize)> {
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => i += 2,
            "--verbose" | "-v" | "--quiet" | "-q" => i += 1,
            other => return Some((other, i)),
        }
    }
    None
}

/// Reads `--minutes N` as a run duration. Rejects values that are not positive or
/// do not fit in a `Duration`.
pub(crate) fn parse_run_minutes(args: &[String], start: usize) -> Result<Duration, String> {
    let mut minutes = DEFAULT_RUN_MINUTES;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--minutes" | "-m" => {
                let Some(raw) = args.get(i + 1) else {
                    return Err("--minutes needs a value".to_string());
                };
                minutes = raw
                    .parse()
                    .map_err(|_| format!("invalid --minutes value: {}", raw))?;
                i += 2;
            }
            _ => i += 1,
        }
    }
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(format!("--minutes must be positive, got {}", minutes));
    }
    Duration::try_from_secs_f64(minutes * 60.0)
        .map_err(|_| format!("--minutes value {} is too large", minutes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AlertCommandArgs {
    pub alert_type: String,
    pub message: String,
    pub severity: Severity,
}

pub(crate) fn parse_alert_command_args(
    args: &[String],
    start: usize,
) -> Result<AlertCommandArgs, String> {
    let mut parsed = AlertCommandArgs {
        alert_type: "test_alert".to_string(),
        message: "Manual test alert raised from the command line".to_string(),
        severity: Severity::Medium,
    };
    let mut i = start;
    while i < args.len() {
        let flag = args[i].as_str();
        if !matches!(flag, "--type" | "--message" | "--severity") {
            i += 1;
            continue;
        }
        let Some(value) = args.get(i + 1) else {
            return Err(format!("{} needs a value", flag));
        };
        match flag {
            "--type" => parsed.alert_type = value.clone(),
            "--message" => parsed.message = value.clone(),
            _ => parsed.severity = value.parse()?,
        }
        i += 2;
    }
    if parsed.alert_type.trim().is_empty() {
        return Err("--type must not be empty".to_string());
    }
    Ok(parsed)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let globals = parse_global_flags(&args, 1);

    let Some((cmd, idx)) = find_command(&args) else {
        print_help();
        return Ok(());
    };

    match cmd {
        "monitor" => monitor::run_monitor(&globals).await,
        "run" => {
            let duration = parse_run_minutes(&args, idx + 1).map_err(|e| anyhow!(e))?;
            monitor::run_bounded(&globals, duration).await
        }
        "check" => monitor::run_check(&globals).await,
        "alert" => {
            let parsed = parse_alert_command_args(&args, idx + 1).map_err(|e| anyhow!(e))?;
            monitor::run_alert(&globals, parsed).await
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_help();
            Err(anyhow!("Unknown command: {}", other))
        }
    }
}
