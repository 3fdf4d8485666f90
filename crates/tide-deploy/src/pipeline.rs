//! Deploy pipeline — drives one stack rollout end to end.

use tide_core::{ControlPlane, Settings, StackSpec, VariableEnvironment};
use tide_rollout::RolloutMonitor;
use tide_vars::{prune, reconcile};
use tracing::{error, info, warn};

use crate::error::DeployResult;
use crate::summary::{DeployStatus, DeploymentSummary};

pub struct Deployer<'a, C: ControlPlane + ?Sized> {
    client: &'a C,
    settings: &'a Settings,
    env: &'a VariableEnvironment,
    summary: DeploymentSummary,
}

impl<'a, C: ControlPlane + ?Sized> Deployer<'a, C> {
    pub fn new(client: &'a C, settings: &'a Settings, env: &'a VariableEnvironment) -> Self {
        Self {
            client,
            settings,
            env,
            summary: DeploymentSummary::new(&settings.stack, &settings.version),
        }
    }

    pub fn summary(&self) -> &DeploymentSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DeploymentSummary {
        self.summary
    }

    /// Run the pipeline. The summary is updated whether or not it succeeds.
    pub async fn deploy(&mut self, spec: &StackSpec) -> DeployResult<()> {
        let result = self.run(spec).await;
        match &result {
            Ok(()) => {
                self.summary.status = DeployStatus::Succeeded;
                info!(
                    stack = %self.settings.stack,
                    version = %self.settings.version,
                    variables = self.summary.variables.len(),
                    pruned = self.summary.removed_count(),
                    "deployment succeeded"
                );
            }
            Err(e) => {
                self.summary.status = DeployStatus::Failed;
                self.summary.error = Some(e.to_string());
                error!(stack = %self.settings.stack, kind = %e.kind(), error = %e, "deployment failed");
            }
        }
        result
    }

    async fn run(&mut self, spec: &StackSpec) -> DeployResult<()> {
        let stack = self.settings.stack.as_str();
        info!(stack = %stack, version = %self.settings.version, "deploying stack");

        let resolved = reconcile(spec, self.settings, self.env)?;
        self.summary.record_resolved(&resolved);

        let deployed = self.client.deploy_stack(&resolved, stack, self.env).await;
        match resolved.cleanup() {
            Ok(removed) => info!(stack = %stack, removed, "generated files removed"),
            Err(e) => warn!(stack = %stack, error = %e, "could not remove generated files"),
        }
        deployed?;

        self.summary.pruned = prune(&resolved, self.settings, self.client).await?;

        let report = RolloutMonitor::new(self.client, stack, &self.settings.monitor)
            .watch()
            .await?;
        let outcome = report.check();
        self.summary.monitor = Some(report);
        outcome?;
        Ok(())
    }
}

/// Deploy a stack and return its summary.
pub async fn deploy<C: ControlPlane + ?Sized>(
    client: &C,
    settings: &Settings,
    env: &VariableEnvironment,
    spec: &StackSpec,
) -> DeployResult<DeploymentSummary> {
    let mut deployer = Deployer::new(client, settings, env);
    deployer.deploy(spec).await?;
    Ok(deployer.into_summary())
}
