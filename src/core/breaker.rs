use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

/// Consecutive-failure circuit breaker gating whether the pipeline counts as healthy.
///
/// `Open` is entered when `consecutive_failures` reaches the threshold, and left for
/// `HalfOpen` only once `recovery_timeout` has elapsed since the last failure.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreaker {
    threshold: u32,
    #[serde(skip)]
    recovery_timeout: Duration,
    consecutive_failures: u32,
    last_failure_time: Option<DateTime<Utc>>,
    state: CircuitState,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_timeout_secs: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            recovery_timeout: Duration::seconds(recovery_timeout_secs as i64),
            consecutive_failures: 0,
            last_failure_time: None,
            state: CircuitState::Closed,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        self.last_failure_time
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records one failure. Returns true only on the call that trips the breaker,
    /// so callers raise a single instability alert per trip.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_time = Some(now);
        if self.state != CircuitState::Open && self.consecutive_failures >= self.threshold {
            self.state = CircuitState::Open;
            return true;
        }
        false
    }

    /// Moves `Open -> HalfOpen` once the cooldown has elapsed. Returns true on transition.
    pub fn check_recovery(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != CircuitState::Open {
            return false;
        }
        let Some(last) = self.last_failure_time else {
            return false;
        };
        if now - last >= self.recovery_timeout {
            self.state = CircuitState::HalfOpen;
            return true;
        }
        false
    }

    /// Clean-cycle reset. Has no effect while `Open`; the breaker must pass through
    /// `HalfOpen` first.
    pub fn record_success(&mut self) -> bool {
        match self.state {
            CircuitState::Open => false,
            CircuitState::Closed | CircuitState::HalfOpen => {
                let changed = self.state != CircuitState::Closed || self.consecutive_failures > 0;
                self.reset();
                changed
            }
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.state = CircuitState::Closed;
    }
}
