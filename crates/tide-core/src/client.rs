//! Control plane client trait.
//!
//! Tideway never talks to the cluster directly. A transport (cluster CLI,
//! HTTP API, ...) implements this trait; every call either returns a
//! structured result or a `ClientError` tagged with the operation and
//! target. Calls are not retried.
//!
//! Filters are passed as `Filter` values. Transports whose filter DSL is
//! not `key=value` map them here, at the client boundary.

use async_trait::async_trait;

use crate::env::VariableEnvironment;
use crate::error::ClientResult;
use crate::types::{
    Filter, InventoryItem, LogLine, LogOptions, ResolvedSpec, ServiceSnapshot, TaskInfo,
    VariableKind,
};

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Apply a resolved stack spec.
    async fn deploy_stack(
        &self,
        spec: &ResolvedSpec,
        stack: &str,
        env: &VariableEnvironment,
    ) -> ClientResult<()>;

    /// List services. With `inspect`, update status is included.
    async fn list_services(
        &self,
        filters: &[Filter],
        inspect: bool,
    ) -> ClientResult<Vec<ServiceSnapshot>>;

    /// Fetch recent log lines of a service.
    async fn service_logs(&self, service_id: &str, options: LogOptions)
    -> ClientResult<Vec<LogLine>>;

    async fn list_service_tasks(&self, service_id: &str) -> ClientResult<Vec<TaskInfo>>;

    async fn list_secrets(&self, filters: &[Filter]) -> ClientResult<Vec<InventoryItem>>;

    async fn list_configs(&self, filters: &[Filter]) -> ClientResult<Vec<InventoryItem>>;

    async fn remove_secret(&self, id: &str) -> ClientResult<()>;

    async fn remove_config(&self, id: &str) -> ClientResult<()>;

    /// List secrets or configs.
    async fn list_variables(
        &self,
        kind: VariableKind,
        filters: &[Filter],
    ) -> ClientResult<Vec<InventoryItem>> {
        match kind {
            VariableKind::Secret => self.list_secrets(filters).await,
            VariableKind::Config => self.list_configs(filters).await,
        }
    }

    /// Remove a secret or config.
    async fn remove_variable(&self, kind: VariableKind, id: &str) -> ClientResult<()> {
        match kind {
            VariableKind::Secret => self.remove_secret(id).await,
            VariableKind::Config => self.remove_config(id).await,
        }
    }
}
