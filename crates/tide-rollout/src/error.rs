//! Rollout monitoring errors.

use thiserror::Error;
use tide_core::{ClientError, ErrorKind};

pub type RolloutResult<T> = Result<T, RolloutError>;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("service '{service}' failed to converge: {reason}")]
    Failed { service: String, reason: String },

    #[error("Deployment timed out after {timeout_secs}s; services not converged: {pending}")]
    TimedOut { timeout_secs: u64, pending: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl RolloutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Failed { .. } | Self::TimedOut { .. } => ErrorKind::Convergence,
            Self::Client(_) => ErrorKind::ControlPlane,
        }
    }
}
