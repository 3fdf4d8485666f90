//! Error kinds shared by every Tideway crate, plus control plane and
//! configuration errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by client errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification every crate-level error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid input detected before any cluster mutation.
    Configuration,
    /// A variable or reference could not be resolved.
    Resolution,
    /// The control plane rejected or failed a call.
    ControlPlane,
    /// The rollout failed or did not converge in time.
    Convergence,
    /// Local filesystem failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Resolution => "resolution",
            Self::ControlPlane => "control plane",
            Self::Convergence => "convergence",
            Self::Io => "io",
        })
    }
}

/// Result type alias for control plane calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// A failed control plane call, tagged with the operation and its target.
#[derive(Debug, Error)]
#[error("{operation} failed for '{target}': {source}")]
pub struct ClientError {
    pub operation: &'static str,
    pub target: String,
    #[source]
    pub source: BoxError,
}

impl ClientError {
    pub fn new(operation: &'static str, target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ControlPlane
    }
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading `tide.toml` or variable inputs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration '{0}' (expected e.g. 500ms, 5s, 10m, 1h)")]
    InvalidDuration(String),

    #[error("invalid dotenv input: {0}")]
    Dotenv(String),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }
}
