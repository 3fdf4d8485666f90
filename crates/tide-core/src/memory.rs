//! In-memory control plane.
//!
//! Suitable for development and testing. Service state is scripted as a
//! sequence of polls: each `list_services` call consumes the next poll,
//! and the last one repeats forever. Inventory, logs and tasks are plain
//! tables; removals and deploys are recorded for inspection. Any
//! operation can be made to fail with `fail`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::ControlPlane;
use crate::env::VariableEnvironment;
use crate::error::{ClientError, ClientResult};
use crate::types::{
    Filter, InventoryItem, LogLine, LogOptions, ResolvedSpec, ServiceSnapshot, TaskInfo,
    VariableKind,
};

#[derive(Default)]
struct Inner {
    polls: VecDeque<Vec<ServiceSnapshot>>,
    secrets: Vec<InventoryItem>,
    configs: Vec<InventoryItem>,
    logs: HashMap<String, Vec<LogLine>>,
    tasks: HashMap<String, Vec<TaskInfo>>,
    failures: HashMap<&'static str, String>,
    removed: Vec<(VariableKind, String)>,
    deployed: Vec<ResolvedSpec>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryControlPlane {
    inner: Mutex<Inner>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue one poll worth of service snapshots.
    pub fn push_poll(&self, services: Vec<ServiceSnapshot>) -> &Self {
        self.lock().polls.push_back(services);
        self
    }

    /// Add a live secret or config.
    pub fn add_item(&self, kind: VariableKind, item: InventoryItem) -> &Self {
        let mut inner = self.lock();
        match kind {
            VariableKind::Secret => inner.secrets.push(item),
            VariableKind::Config => inner.configs.push(item),
        }
        drop(inner);
        self
    }

    pub fn set_logs(&self, service_id: &str, lines: Vec<LogLine>) -> &Self {
        self.lock().logs.insert(service_id.to_string(), lines);
        self
    }

    pub fn set_tasks(&self, service_id: &str, tasks: Vec<TaskInfo>) -> &Self {
        self.lock().tasks.insert(service_id.to_string(), tasks);
        self
    }

    /// Make every call of `operation` fail with `message`.
    pub fn fail(&self, operation: &'static str, message: &str) -> &Self {
        self.lock().failures.insert(operation, message.to_string());
        self
    }

    /// Items removed so far, in call order.
    pub fn removed(&self) -> Vec<(VariableKind, String)> {
        self.lock().removed.clone()
    }

    /// Specs passed to `deploy_stack`, in call order.
    pub fn deployed(&self) -> Vec<ResolvedSpec> {
        self.lock().deployed.clone()
    }

    /// Operation names of every call made, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of `list_services` calls made.
    pub fn polls_served(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == "list_services")
            .count()
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, operation: &'static str, target: &str) -> ClientResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(operation.to_string());
        if let Some(message) = inner.failures.get(operation).cloned() {
            return Err(ClientError::new(operation, target, message));
        }
        Ok(inner)
    }
}

fn filtered(items: &[InventoryItem], filters: &[Filter]) -> Vec<InventoryItem> {
    items
        .iter()
        .filter(|item| filters.iter().all(|f| f.matches(&item.name, &item.labels)))
        .cloned()
        .collect()
}

fn remove_by_id(items: &mut Vec<InventoryItem>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id != id);
    items.len() != before
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn deploy_stack(
        &self,
        spec: &ResolvedSpec,
        stack: &str,
        _env: &VariableEnvironment,
    ) -> ClientResult<()> {
        let mut inner = self.enter("deploy_stack", stack)?;
        inner.deployed.push(spec.clone());
        Ok(())
    }

    async fn list_services(
        &self,
        filters: &[Filter],
        _inspect: bool,
    ) -> ClientResult<Vec<ServiceSnapshot>> {
        let target = filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut inner = self.enter("list_services", &target)?;
        let services = if inner.polls.len() > 1 {
            inner.polls.pop_front().unwrap_or_default()
        } else {
            inner.polls.front().cloned().unwrap_or_default()
        };
        Ok(services)
    }

    async fn service_logs(
        &self,
        service_id: &str,
        options: LogOptions,
    ) -> ClientResult<Vec<LogLine>> {
        let inner = self.enter("service_logs", service_id)?;
        let lines: Vec<LogLine> = inner
            .logs
            .get(service_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|l| l.timestamp >= options.since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let skip = lines.len().saturating_sub(options.tail as usize);
        Ok(lines.into_iter().skip(skip).collect())
    }

    async fn list_service_tasks(&self, service_id: &str) -> ClientResult<Vec<TaskInfo>> {
        let inner = self.enter("list_service_tasks", service_id)?;
        Ok(inner.tasks.get(service_id).cloned().unwrap_or_default())
    }

    async fn list_secrets(&self, filters: &[Filter]) -> ClientResult<Vec<InventoryItem>> {
        let inner = self.enter("list_secrets", "secrets")?;
        Ok(filtered(&inner.secrets, filters))
    }

    async fn list_configs(&self, filters: &[Filter]) -> ClientResult<Vec<InventoryItem>> {
        let inner = self.enter("list_configs", "configs")?;
        Ok(filtered(&inner.configs, filters))
    }

    async fn remove_secret(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.enter("remove_secret", id)?;
        if !remove_by_id(&mut inner.secrets, id) {
            return Err(ClientError::new("remove_secret", id, "no such secret"));
        }
        inner.removed.push((VariableKind::Secret, id.to_string()));
        Ok(())
    }

    async fn remove_config(&self, id: &str) -> ClientResult<()> {
        let mut inner = self.enter("remove_config", id)?;
        if !remove_by_id(&mut inner.configs, id) {
            return Err(ClientError::new("remove_config", id, "no such config"));
        }
        inner.removed.push((VariableKind::Config, id.to_string()));
        Ok(())
    }
}
