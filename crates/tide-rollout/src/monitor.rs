//! Rollout monitor — polls services until the stack converges.
//!
//! `MonitorState` is the pure state machine:
//!
//! ```text
//! Polling ──all services complete──▶ Converged
//!    │ └────rollback / unknown state──▶ Failed
//!    └──────attempts exhausted───────▶ TimedOut
//! ```
//!
//! `RolloutMonitor` drives it against a `ControlPlane`, sleeping one
//! interval between polls. The timeout is an attempt budget, not a wall
//! clock deadline.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tide_core::{ControlPlane, Filter, MonitorSettings, ServiceSnapshot};
use tracing::{debug, error, info};

use crate::diagnostics::{collect_diagnostics, ServiceDiagnostics};
use crate::error::{RolloutError, RolloutResult};
use crate::status::{assess, ServiceProgress};

/// Current phase of a rollout watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorPhase {
    Polling,
    Converged,
    TimedOut,
    Failed {
        service_id: String,
        service: String,
        reason: String,
    },
}

/// Convergence bookkeeping across polls.
#[derive(Debug, Clone)]
pub struct MonitorState {
    phase: MonitorPhase,
    completed: BTreeSet<String>,
    attempts_remaining: u32,
    started_at: DateTime<Utc>,
    /// Services still incomplete after the last poll.
    pending: Vec<ServiceSnapshot>,
}

impl MonitorState {
    pub fn new(timeout: Duration, interval: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            phase: MonitorPhase::Polling,
            completed: BTreeSet::new(),
            attempts_remaining: attempt_budget(timeout, interval),
            started_at,
            pending: Vec::new(),
        }
    }

    pub fn phase(&self) -> &MonitorPhase {
        &self.phase
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn pending(&self) -> &[ServiceSnapshot] {
        &self.pending
    }

    pub fn is_completed(&self, service_id: &str) -> bool {
        self.completed.contains(service_id)
    }

    /// Consume one attempt. With none left the watch times out and
    /// `false` is returned; no fetch should follow.
    pub fn begin_attempt(&mut self) -> bool {
        if self.phase != MonitorPhase::Polling {
            return false;
        }
        if self.attempts_remaining == 0 {
            self.phase = MonitorPhase::TimedOut;
            return false;
        }
        self.attempts_remaining -= 1;
        true
    }

    /// Fold one poll's snapshots into the state.
    ///
    /// Completed services stay completed. The first failing service ends
    /// the watch regardless of the attempts left.
    pub fn observe(&mut self, services: &[ServiceSnapshot]) -> &MonitorPhase {
        if self.phase != MonitorPhase::Polling {
            return &self.phase;
        }

        self.pending.clear();
        for service in services {
            if self.completed.contains(&service.id) {
                continue;
            }
            match assess(service) {
                ServiceProgress::Complete => {
                    debug!(service = %service.name, "service converged");
                    self.completed.insert(service.id.clone());
                }
                ServiceProgress::Pending => self.pending.push(service.clone()),
                ServiceProgress::Failed { reason } => {
                    self.phase = MonitorPhase::Failed {
                        service_id: service.id.clone(),
                        service: service.name.clone(),
                        reason,
                    };
                    return &self.phase;
                }
            }
        }

        if self.pending.is_empty() {
            self.phase = MonitorPhase::Converged;
        }
        &self.phase
    }
}

/// `ceil(timeout / interval)`, at least one attempt.
fn attempt_budget(timeout: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 1;
    }
    let attempts = timeout.as_nanos().div_ceil(interval.as_nanos()).max(1);
    u32::try_from(attempts).unwrap_or(u32::MAX)
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// Monitoring is turned off; nothing was polled.
    Disabled,
    Converged,
    Failed { service: String, reason: String },
    TimedOut { pending: Vec<String> },
}

/// Result of a watch, with diagnostics for anything that did not converge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorReport {
    #[serde(flatten)]
    pub outcome: MonitorOutcome,
    pub polls: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ServiceDiagnostics>,
    #[serde(skip)]
    timeout: Duration,
}

impl MonitorReport {
    fn disabled() -> Self {
        Self {
            outcome: MonitorOutcome::Disabled,
            polls: 0,
            diagnostics: Vec::new(),
            timeout: Duration::ZERO,
        }
    }

    /// The convergence error this report stands for, if any.
    pub fn error(&self) -> Option<RolloutError> {
        match &self.outcome {
            MonitorOutcome::Disabled | MonitorOutcome::Converged => None,
            MonitorOutcome::Failed { service, reason } => Some(RolloutError::Failed {
                service: service.clone(),
                reason: reason.clone(),
            }),
            MonitorOutcome::TimedOut { pending } => Some(RolloutError::TimedOut {
                timeout_secs: self.timeout.as_secs(),
                pending: pending.join(", "),
            }),
        }
    }

    pub fn check(&self) -> RolloutResult<()> {
        match self.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Watches one stack's services through a control plane.
pub struct RolloutMonitor<'a, C: ControlPlane + ?Sized> {
    client: &'a C,
    stack: &'a str,
    settings: &'a MonitorSettings,
}

impl<'a, C: ControlPlane + ?Sized> RolloutMonitor<'a, C> {
    pub fn new(client: &'a C, stack: &'a str, settings: &'a MonitorSettings) -> Self {
        Self {
            client,
            stack,
            settings,
        }
    }

    /// Poll until the watch ends. Only control plane failures while
    /// polling are returned as errors; failed and timed out rollouts are
    /// reported in the `MonitorReport`.
    pub async fn watch(&self) -> RolloutResult<MonitorReport> {
        if !self.settings.enabled {
            info!(stack = %self.stack, "rollout monitoring disabled");
            return Ok(MonitorReport::disabled());
        }

        let mut state = MonitorState::new(self.settings.timeout, self.settings.interval, Utc::now());
        let filters = [Filter::namespace(self.stack)];
        info!(
            stack = %self.stack,
            attempts = state.attempts_remaining(),
            interval_ms = self.settings.interval.as_millis() as u64,
            "monitoring rollout"
        );

        let mut polls = 0u32;
        while state.begin_attempt() {
            let services = self.client.list_services(&filters, true).await?;
            polls += 1;
            if *state.observe(&services) != MonitorPhase::Polling {
                break;
            }
            debug!(
                stack = %self.stack,
                poll = polls,
                pending = state.pending().len(),
                attempts_remaining = state.attempts_remaining(),
                "rollout in progress"
            );
            if state.attempts_remaining() > 0 {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        let mut report = MonitorReport {
            outcome: MonitorOutcome::Converged,
            polls,
            diagnostics: Vec::new(),
            timeout: self.settings.timeout,
        };

        match state.phase().clone() {
            MonitorPhase::Converged => {
                info!(stack = %self.stack, polls, "rollout converged");
            }
            MonitorPhase::Failed {
                service_id,
                service,
                reason,
            } => {
                error!(stack = %self.stack, service = %service, reason = %reason, "rollout failed");
                report.diagnostics.push(self.diagnose(&state, &service_id, &service).await);
                report.outcome = MonitorOutcome::Failed { service, reason };
            }
            MonitorPhase::TimedOut | MonitorPhase::Polling => {
                let pending: Vec<String> = state.pending().iter().map(|s| s.name.clone()).collect();
                error!(
                    stack = %self.stack,
                    polls,
                    pending = %pending.join(", "),
                    "rollout timed out"
                );
                for service in state.pending() {
                    report
                        .diagnostics
                        .push(self.diagnose(&state, &service.id, &service.name).await);
                }
                report.outcome = MonitorOutcome::TimedOut { pending };
            }
        }
        Ok(report)
    }

    /// Watch and turn a failed or timed out rollout into an error.
    pub async fn run(&self) -> RolloutResult<()> {
        self.watch().await?.check()
    }

    async fn diagnose(&self, state: &MonitorState, service_id: &str, service: &str) -> ServiceDiagnostics {
        let diagnostics = collect_diagnostics(
            self.client,
            service_id,
            service,
            state.started_at(),
            self.settings.log_tail,
        )
        .await;
        diagnostics.log();
        diagnostics
    }
}

/// Watch a stack's rollout with the given settings.
pub async fn monitor<C: ControlPlane + ?Sized>(
    client: &C,
    stack: &str,
    settings: &MonitorSettings,
) -> RolloutResult<()> {
    RolloutMonitor::new(client, stack, settings).run().await
}
