//! Domain types shared across Tideway crates.
//!
//! Declarations are parsed once from the stack spec, resolved variables
//! are produced during reconciliation, and inventory items and service
//! snapshots are fetched from the control plane on every run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::{self, Directive, ReservedLabel};

/// Label map as stored on cluster objects.
pub type Labels = BTreeMap<String, String>;

/// The two kinds of injected variables. Both share one lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Secret,
    Config,
}

impl VariableKind {
    pub const ALL: [VariableKind; 2] = [Self::Secret, Self::Config];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Stack spec ────────────────────────────────────────────────────

/// A stack spec as handed over by the discovery/merge layer.
///
/// Only `services`, `secrets` and `configs` are interpreted; every other
/// top-level section (networks, volumes, version, ...) is carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, VariableDeclaration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, VariableDeclaration>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StackSpec {
    /// Declarations of the given kind, keyed by logical name.
    pub fn declarations(&self, kind: VariableKind) -> &BTreeMap<String, VariableDeclaration> {
        match kind {
            VariableKind::Secret => &self.secrets,
            VariableKind::Config => &self.configs,
        }
    }

    pub fn declarations_mut(
        &mut self,
        kind: VariableKind,
    ) -> &mut BTreeMap<String, VariableDeclaration> {
        match kind {
            VariableKind::Secret => &mut self.secrets,
            VariableKind::Config => &mut self.configs,
        }
    }
}

/// A secret or config as declared in the stack spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Read content from this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Read content from this environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Inline content, interpolated against the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Explicit base name for the materialized object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "labels::deserialize_labels",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: Labels,
    /// References an object that already exists in the cluster.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    /// Keys Tideway does not interpret (`template_driver`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VariableDeclaration {
    /// Declaration with inline content only.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Declaration reading from a file only.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Default::default()
        }
    }

    /// Declaration reading from an environment variable only.
    pub fn with_environment(variable: impl Into<String>) -> Self {
        Self {
            environment: Some(variable.into()),
            ..Default::default()
        }
    }

    /// True if the ignore directive is set to anything but `false`.
    pub fn is_ignored(&self) -> bool {
        self.labels
            .get(Directive::Ignore.key())
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
    }

    /// Names of the explicit source fields that are set.
    pub fn explicit_sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.file.is_some() {
            sources.push("file");
        }
        if self.environment.is_some() {
            sources.push("environment");
        }
        if self.content.is_some() {
            sources.push("content");
        }
        sources
    }
}

// ── Resolved variables ────────────────────────────────────────────

/// Identity of a materialized variable: stack, logical name and content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableIdentity {
    pub stack: String,
    pub logical_name: String,
    pub hash: String,
}

impl VariableIdentity {
    /// Read the identity back from reserved labels. `None` if any is missing.
    pub fn from_labels(labels: &Labels) -> Option<Self> {
        if !labels::has_identity(labels) {
            return None;
        }
        Some(Self {
            stack: labels.get(ReservedLabel::Stack.key())?.clone(),
            logical_name: labels.get(ReservedLabel::Name.key())?.clone(),
            hash: labels.get(ReservedLabel::Hash.key())?.clone(),
        })
    }
}

/// A declaration after reconciliation: content hashed, written to a file,
/// and given its versioned name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVariable {
    pub kind: VariableKind,
    pub stack: String,
    /// Key in the stack file, stable across rotations.
    pub logical_name: String,
    /// `{base}-{hash[:7]}`.
    pub name: String,
    /// Hex sha256 of the trimmed content.
    pub hash: String,
    /// File holding the content.
    pub file: PathBuf,
    /// Whether `file` was written by Tideway and should be cleaned up.
    pub generated: bool,
    pub labels: Labels,
    /// Rewritten declaration referencing only `file`.
    pub declaration: VariableDeclaration,
}

impl ResolvedVariable {
    pub fn identity(&self) -> VariableIdentity {
        VariableIdentity {
            stack: self.stack.clone(),
            logical_name: self.logical_name.clone(),
            hash: self.hash.clone(),
        }
    }

    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

/// Output of reconciliation, ready to hand to the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSpec {
    pub stack: String,
    pub version: String,
    /// Stack spec with services interpolated and declarations rewritten.
    pub spec: StackSpec,
    /// Every managed variable, secrets first.
    pub variables: Vec<ResolvedVariable>,
    /// Ignored and external declarations left untouched.
    pub unmanaged: Vec<(VariableKind, String)>,
}

impl ResolvedSpec {
    pub fn variables_of(&self, kind: VariableKind) -> impl Iterator<Item = &ResolvedVariable> {
        self.variables.iter().filter(move |v| v.kind == kind)
    }

    pub fn generated_files(&self) -> impl Iterator<Item = &Path> {
        self.variables
            .iter()
            .filter(|v| v.generated)
            .map(|v| v.file.as_path())
    }

    /// Remove generated files. Returns how many were deleted; files that
    /// are already gone are skipped.
    pub fn cleanup(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for path in self.generated_files() {
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

// ── Control plane records ─────────────────────────────────────────

/// A secret or config as it exists in the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Labels,
}

/// Replica counts reported for a replicated service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCounts {
    pub running: u64,
    pub desired: u64,
}

/// Explicit update status reported while a service is being updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Point-in-time view of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<ReplicaCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_status: Option<UpdateStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task (container slot) of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub service_id: String,
    /// Current task state: `running`, `failed`, `rejected`, `shutdown`, ...
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One line of service log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub message: String,
}

/// Bounds for a service log fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub since: DateTime<Utc>,
    pub tail: u32,
}

/// Filter passed to list operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Label { key: String, value: String },
    Name(String),
}

impl Filter {
    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Label {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Objects belonging to a stack namespace.
    pub fn namespace(stack: &str) -> Self {
        Self::label(labels::STACK_NAMESPACE, stack)
    }

    /// Tideway-managed variables of a stack.
    pub fn stack(stack: &str) -> Self {
        Self::label(ReservedLabel::Stack.key(), stack)
    }

    /// Whether a label map satisfies this filter. Name filters never match labels.
    pub fn matches(&self, name: &str, labels: &Labels) -> bool {
        match self {
            Self::Label { key, value } => labels.get(key) == Some(value),
            Self::Name(n) => name == n,
        }
    }
}

/// Renders `label=key=value` / `name=value`, the filter strings the
/// cluster CLI accepts verbatim.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label { key, value } => write!(f, "label={key}={value}"),
            Self::Name(name) => write!(f, "name={name}"),
        }
    }
}
