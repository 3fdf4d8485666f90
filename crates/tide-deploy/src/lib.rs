//! tide-deploy — the Tideway deploy pipeline.
//!
//! One run of `Deployer::deploy`:
//!
//! 1. reconcile the stack spec (interpolate services, materialize variables)
//! 2. apply it through the control plane
//! 3. remove the generated files
//! 4. prune superseded secret and config versions
//! 5. watch the rollout until it converges
//!
//! Any error aborts the run. The `DeploymentSummary` records how far the
//! run got, including rollout diagnostics.

pub mod error;
pub mod pipeline;
pub mod summary;

pub use error::{DeployError, DeployResult};
pub use pipeline::{deploy, Deployer};
pub use summary::{DeployStatus, DeploymentSummary, VariableSummary};
