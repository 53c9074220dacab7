use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{error, info};

use super::{AgentStatus, CreativeAutomationAgent};

/// Shared run flag for the monitoring loop. Cloned out to signal handlers so the
/// loop can be stopped without touching the agent itself.
#[derive(Clone, Default)]
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl MonitorHandle {
    /// Clears the run flag and cuts the current sleep short. The loop exits before
    /// starting another cycle. No wakeup is stored, so a later run sleeps normally.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    async fn sleep(&self, duration: Duration) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        // Registered before the flag check so a concurrent stop cannot slip between them.
        notified.as_mut().enable();
        if !self.is_running() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
    }
}

impl CreativeAutomationAgent {
    pub fn monitor_handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn stop_monitoring(&self) {
        info!("Stopping monitoring");
        self.handle.stop();
    }

    /// Runs cycles until [`stop_monitoring`](Self::stop_monitoring) is called.
    pub async fn start_monitoring(&mut self) {
        self.handle.set_running(true);
        info!(
            "Monitoring started (interval {}s, breaker threshold {})",
            self.monitor.check_interval_secs,
            self.breaker.threshold()
        );
        while self.handle.is_running() {
            let delay = self.run_iteration().await;
            self.handle.sleep(delay).await;
        }
        info!("Monitoring stopped");
    }

    /// Runs the loop for a bounded wall-clock duration, then restores the run flag to
    /// what it was on entry and returns the final status.
    pub async fn run_agent_monitor(&mut self, duration: Duration) -> AgentStatus {
        let handle = self.handle.clone();
        let restore = scopeguard::guard(handle.is_running(), move |previous| {
            handle.set_running(previous)
        });

        self.handle.set_running(true);
        info!("Bounded monitoring run for {:?}", duration);
        let deadline = Instant::now() + duration;
        while self.handle.is_running() && Instant::now() < deadline {
            let delay = self.run_iteration().await;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.handle.sleep(delay.min(remaining)).await;
        }

        drop(restore);
        self.get_status()
    }

    /// A single iteration outside the loop, for `check`.
    pub async fn run_once(&mut self) -> AgentStatus {
        self.run_iteration().await;
        self.get_status()
    }

    /// One loop iteration: a cycle plus the breaker bookkeeping around it. Returns how
    /// long to sleep before the next one.
    pub(crate) async fn run_iteration(&mut self) -> Duration {
        self.failures_this_cycle = 0;
        match self.run_cycle().await {
            Ok(()) => {
                if self.failures_this_cycle == 0 && self.breaker.record_success() {
                    info!("Clean cycle, circuit breaker reset");
                }
                self.monitor.check_interval()
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!("Monitoring cycle failed: {}", reason);
                self.handle_failure(&reason).await;
                self.monitor.error_backoff()
            }
        }
    }

    async fn run_cycle(&mut self) -> Result<()> {
        self.check_new_briefs()
            .await
            .context("checking for new campaign briefs")?;
        self.monitor_system_health()
            .await
            .context("checking system health")?;
        self.track_variants()
            .await
            .context("tracking generated variants")?;
        self.process_alerts().await;
        self.error_recovery();
        Ok(())
    }
}
