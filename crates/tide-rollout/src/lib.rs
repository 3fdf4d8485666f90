//! tide-rollout — verifies that a deployed stack converges.
//!
//! After the stack is applied, services are polled on a fixed interval
//! until every one of them reports its desired replica count or a
//! `completed` update, until a rollback or unrecognized update state is
//! seen, or until the attempt budget (`ceil(timeout / interval)`) runs out.
//!
//! # Components
//!
//! - **`status`** — update states, their failure reasons, per-service assessment
//! - **`monitor`** — the convergence state machine and the async polling loop
//! - **`diagnostics`** — best-effort logs and task errors for failed services

pub mod diagnostics;
pub mod error;
pub mod monitor;
pub mod status;

pub use diagnostics::{collect_diagnostics, ServiceDiagnostics};
pub use error::{RolloutError, RolloutResult};
pub use monitor::{monitor, MonitorOutcome, MonitorPhase, MonitorReport, MonitorState, RolloutMonitor};
pub use status::{assess, ServiceProgress, UpdateState};
