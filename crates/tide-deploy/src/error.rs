//! Deploy pipeline errors.

use thiserror::Error;
use tide_core::{ClientError, ErrorKind};
use tide_rollout::RolloutError;
use tide_vars::VariableError;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Variables(#[from] VariableError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Variables(e) => e.kind(),
            Self::Client(e) => e.kind(),
            Self::Rollout(e) => e.kind(),
        }
    }
}
