//! Failure diagnostics.
//!
//! Collected after a rollout fails or times out. Every fetch is best
//! effort: errors are logged at debug level and the corresponding field
//! is left empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tide_core::{ControlPlane, LogLine, LogOptions, TaskInfo};
use tracing::{debug, warn};

/// Task states whose error text explains a failed rollout.
const TERMINAL_TASK_STATES: [&str; 3] = ["failed", "rejected", "shutdown"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDiagnostics {
    pub service_id: String,
    pub service: String,
    /// Log lines emitted since the rollout started, newest last.
    pub logs: Vec<LogLine>,
    /// Error of the most recently updated failed, rejected or shut down task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_error: Option<String>,
}

impl ServiceDiagnostics {
    /// Emit the collected information as log events.
    pub fn log(&self) {
        warn!(
            service = %self.service,
            task_error = self.task_error.as_deref().unwrap_or("none"),
            log_lines = self.logs.len(),
            "service diagnostics"
        );
        for line in &self.logs {
            warn!(service = %self.service, timestamp = %line.timestamp, "{}", line.message);
        }
    }
}

pub async fn collect_diagnostics<C: ControlPlane + ?Sized>(
    client: &C,
    service_id: &str,
    service: &str,
    since: DateTime<Utc>,
    tail: u32,
) -> ServiceDiagnostics {
    let logs = match client.service_logs(service_id, LogOptions { since, tail }).await {
        Ok(lines) => lines,
        Err(e) => {
            debug!(service = %service, error = %e, "could not fetch service logs");
            Vec::new()
        }
    };

    let task_error = match client.list_service_tasks(service_id).await {
        Ok(tasks) => latest_task_error(&tasks),
        Err(e) => {
            debug!(service = %service, error = %e, "could not fetch service tasks");
            None
        }
    };

    ServiceDiagnostics {
        service_id: service_id.to_string(),
        service: service.to_string(),
        logs,
        task_error,
    }
}

fn latest_task_error(tasks: &[TaskInfo]) -> Option<String> {
    let task = tasks
        .iter()
        .filter(|t| TERMINAL_TASK_STATES.contains(&t.state.to_ascii_lowercase().as_str()))
        .max_by_key(|t| t.updated_at)?;
    task.error.clone().or_else(|| task.message.clone())
}
