//! Deployment summary, serializable for CI output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tide_core::{ResolvedSpec, VariableKind};
use tide_rollout::MonitorReport;
use tide_vars::{PruneReport, RotationNotice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub kind: VariableKind,
    pub logical_name: String,
    pub name: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentSummary {
    pub stack: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub status: DeployStatus,
    pub variables: Vec<VariableSummary>,
    /// `{kind}/{name}` of ignored and external declarations.
    pub unmanaged: Vec<String>,
    pub pruned: Vec<PruneReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentSummary {
    pub fn new(stack: &str, version: &str) -> Self {
        Self {
            stack: stack.to_string(),
            version: version.to_string(),
            started_at: Utc::now(),
            status: DeployStatus::Pending,
            variables: Vec::new(),
            unmanaged: Vec::new(),
            pruned: Vec::new(),
            monitor: None,
            error: None,
        }
    }

    pub(crate) fn record_resolved(&mut self, resolved: &ResolvedSpec) {
        self.variables = resolved
            .variables
            .iter()
            .map(|v| VariableSummary {
                kind: v.kind,
                logical_name: v.logical_name.clone(),
                name: v.name.clone(),
                hash: v.hash.clone(),
            })
            .collect();
        self.unmanaged = resolved
            .unmanaged
            .iter()
            .map(|(kind, name)| format!("{kind}/{name}"))
            .collect();
    }

    /// Rotation warnings across all prune reports.
    pub fn rotation_due(&self) -> impl Iterator<Item = &RotationNotice> {
        self.pruned.iter().flat_map(|r| r.rotation_due.iter())
    }

    pub fn removed_count(&self) -> usize {
        self.pruned.iter().map(|r| r.removed.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_empty_optionals() {
        let summary = DeploymentSummary::new("demo", "v1");
        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(value["stack"], "demo");
        assert_eq!(value["status"], "pending");
        assert!(value.get("monitor").is_none());
        assert!(value.get("error").is_none());
        assert_eq!(summary.removed_count(), 0);
        assert_eq!(summary.rotation_due().count(), 0);
    }
}
