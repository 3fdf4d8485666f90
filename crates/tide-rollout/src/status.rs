//! Service update states and per-service progress.

use std::fmt;

use tide_core::ServiceSnapshot;

/// Update state reported by the orchestrator while a service changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Completed,
    Updating,
    Paused,
    RollbackStarted,
    RollbackCompleted,
    RollbackPaused,
    Unknown(String),
}

impl UpdateState {
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "updating" => Self::Updating,
            "paused" => Self::Paused,
            "rollback_started" => Self::RollbackStarted,
            "rollback_completed" => Self::RollbackCompleted,
            "rollback_paused" => Self::RollbackPaused,
            _ => Self::Unknown(state.to_string()),
        }
    }

    /// Failure reason for states that end the rollout. `None` for
    /// `completed` and `updating`.
    pub fn failure_reason(&self) -> Option<String> {
        let reason = match self {
            Self::Completed | Self::Updating => return None,
            Self::Paused => "update paused, a task most likely failed to start".to_string(),
            Self::RollbackStarted => "update failed and a rollback was started".to_string(),
            Self::RollbackCompleted => "update failed and was rolled back".to_string(),
            Self::RollbackPaused => "update failed and the rollback was paused".to_string(),
            Self::Unknown(state) => format!("unrecognized update state '{state}'"),
        };
        Some(reason)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Updating => "updating",
            Self::Paused => "paused",
            Self::RollbackStarted => "rollback_started",
            Self::RollbackCompleted => "rollback_completed",
            Self::RollbackPaused => "rollback_paused",
            Self::Unknown(state) => state,
        };
        f.write_str(s)
    }
}

/// Where a single service stands in the rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceProgress {
    Complete,
    Pending,
    Failed { reason: String },
}

/// Assess one snapshot.
///
/// An explicit update status takes precedence; without one, the service
/// is complete once running replicas match the desired count.
pub fn assess(snapshot: &ServiceSnapshot) -> ServiceProgress {
    match &snapshot.update_status {
        Some(status) => {
            let state = UpdateState::parse(&status.state);
            match state.failure_reason() {
                None if state == UpdateState::Completed => ServiceProgress::Complete,
                None => ServiceProgress::Pending,
                Some(reason) => ServiceProgress::Failed {
                    reason: match status.message.as_deref().map(str::trim) {
                        Some(message) if !message.is_empty() => format!("{reason}: {message}"),
                        _ => reason,
                    },
                },
            }
        }
        None => match snapshot.replicas {
            Some(r) if r.running == r.desired => ServiceProgress::Complete,
            _ => ServiceProgress::Pending,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tide_core::{ReplicaCounts, UpdateStatus};

    use super::*;

    fn snapshot(replicas: Option<(u64, u64)>, status: Option<(&str, Option<&str>)>) -> ServiceSnapshot {
        ServiceSnapshot {
            id: "svc1".into(),
            name: "demo_web".into(),
            replicas: replicas.map(|(running, desired)| ReplicaCounts { running, desired }),
            update_status: status.map(|(state, message)| UpdateStatus {
                state: state.into(),
                message: message.map(Into::into),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn replicas_decide_without_update_status() {
        assert_eq!(assess(&snapshot(Some((2, 2)), None)), ServiceProgress::Complete);
        assert_eq!(assess(&snapshot(Some((1, 2)), None)), ServiceProgress::Pending);
        assert_eq!(assess(&snapshot(None, None)), ServiceProgress::Pending);
    }

    #[test]
    fn update_status_overrides_replicas() {
        assert_eq!(
            assess(&snapshot(Some((2, 2)), Some(("updating", None)))),
            ServiceProgress::Pending
        );
        assert_eq!(
            assess(&snapshot(Some((0, 2)), Some(("completed", None)))),
            ServiceProgress::Complete
        );
    }

    #[test]
    fn failure_reasons_include_status_message() {
        let progress = assess(&snapshot(None, Some(("rollback_started", Some("task exited (1)")))));
        assert_eq!(
            progress,
            ServiceProgress::Failed {
                reason: "update failed and a rollback was started: task exited (1)".into()
            }
        );

        let ServiceProgress::Failed { reason } = assess(&snapshot(None, Some(("frobnicating", None)))) else {
            panic!("unknown states fail the rollout");
        };
        assert_eq!(reason, "unrecognized update state 'frobnicating'");
    }

    #[test]
    fn every_terminal_state_has_a_reason() {
        for state in ["paused", "rollback_started", "rollback_completed", "rollback_paused"] {
            let parsed = UpdateState::parse(state);
            assert!(parsed.failure_reason().is_some(), "{state}");
            assert_eq!(parsed.to_string(), state);
        }
        assert!(UpdateState::parse("Completed").failure_reason().is_none());
    }
}
