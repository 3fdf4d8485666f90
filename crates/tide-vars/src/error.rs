//! Variable lifecycle error types.

use std::path::PathBuf;

use thiserror::Error;
use tide_core::{ClientError, ErrorKind, VariableKind};
use tide_interp::InterpolationError;

/// Result type alias for variable lifecycle operations.
pub type VariableResult<T> = Result<T, VariableError>;

#[derive(Debug, Error)]
pub enum VariableError {
    #[error("stack spec has no services section")]
    MissingServices,

    #[error("{kind} '{name}' declares {sources}; only one of file, environment, content may be set")]
    MultipleSources {
        kind: VariableKind,
        name: String,
        sources: String,
    },

    #[error("{kind} '{name}' sets both encode and decode")]
    ConflictingCodec { kind: VariableKind, name: String },

    #[error("unknown {direction} value '{value}' on '{name}'; supported values: {supported}")]
    UnknownCodec {
        name: String,
        direction: &'static str,
        value: String,
        supported: String,
    },

    #[error("could not read '{name}' from {path}: {source}")]
    FileRead {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable '{variable}' referenced by '{name}' is not defined")]
    EnvironmentMissing { name: String, variable: String },

    #[error("no content for '{name}': expected file {file} or one of the environment variables {candidates}")]
    NoSource {
        name: String,
        file: PathBuf,
        candidates: String,
    },

    #[error("could not {direction} '{name}' as {codec}: {reason}")]
    Codec {
        name: String,
        direction: &'static str,
        codec: &'static str,
        reason: String,
    },

    #[error("could not interpolate '{name}': {source}")]
    Interpolation {
        name: String,
        #[source]
        source: InterpolationError,
    },

    #[error("could not read environment file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },

    #[error("could not write generated file {path}: {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not generate a unique file token: {0}")]
    Token(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl VariableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingServices
            | Self::MultipleSources { .. }
            | Self::ConflictingCodec { .. }
            | Self::UnknownCodec { .. } => ErrorKind::Configuration,
            Self::FileRead { .. }
            | Self::EnvironmentMissing { .. }
            | Self::NoSource { .. }
            | Self::Codec { .. }
            | Self::Interpolation { .. } => ErrorKind::Resolution,
            Self::EnvFile { .. } | Self::Materialize { .. } | Self::Token(_) => ErrorKind::Io,
            Self::Client(_) => ErrorKind::ControlPlane,
        }
    }
}
