//! Builds the layered variable environment for a run.
//!
//! Priority, lowest first: process environment, `variables` (env files,
//! then inline values), `secrets` (secret files, then inline values).
//! Exclusions are applied next, then the synthetic stack/version entries,
//! and finally `extra` variables, which exclusions never touch.

use std::path::Path;

use tide_core::env::{DEPLOYMENT_VERSION_VAR, STACK_NAME_VAR};
use tide_core::{Layer, Settings, VariableEnvironment};
use tracing::debug;

use crate::error::{VariableError, VariableResult};

pub fn build_environment<I>(settings: &Settings, process_env: I) -> VariableResult<VariableEnvironment>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env = VariableEnvironment::new();
    env.layer(Layer::Process, process_env);

    for path in &settings.env_files {
        env.layer(Layer::Variables, read_env_file(path)?);
    }
    env.layer(Layer::Variables, settings.variables.clone());

    for path in &settings.secret_files {
        env.layer(Layer::Secrets, read_env_file(path)?);
    }
    env.layer(Layer::Secrets, settings.secrets.clone());

    let excluded = env.exclude(&settings.exclude_variables);

    env.layer(
        Layer::Synthetic,
        [
            (STACK_NAME_VAR, settings.stack.as_str()),
            (DEPLOYMENT_VERSION_VAR, settings.version.as_str()),
        ],
    );
    env.layer(Layer::Extra, settings.extra_variables.clone());

    debug!(
        stack = %settings.stack,
        entries = env.len(),
        excluded,
        "variable environment built"
    );
    Ok(env)
}

/// Read a dotenv file into `(name, value)` pairs.
pub fn read_env_file(path: &Path) -> VariableResult<Vec<(String, String)>> {
    let env_file_error = |reason: String| VariableError::EnvFile {
        path: path.to_path_buf(),
        reason,
    };
    dotenvy::from_path_iter(path)
        .map_err(|e| env_file_error(e.to_string()))?
        .map(|item| item.map_err(|e| env_file_error(e.to_string())))
        .collect()
}
