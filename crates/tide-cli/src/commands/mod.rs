pub mod env;
pub mod interpolate;
pub mod reconcile;

use std::path::Path;

use anyhow::Context;
use tide_core::config::parse_dotenv;
use tide_core::Settings;

/// Load tide.toml and apply command-line overrides.
pub fn load_settings(
    config: &Path,
    version: Option<&str>,
    variables: Option<&str>,
    secrets: Option<&str>,
) -> anyhow::Result<Settings> {
    let mut settings =
        Settings::load(config).with_context(|| format!("loading {}", config.display()))?;
    if let Some(version) = version {
        settings.version = version.to_string();
    }
    if let Some(text) = variables {
        settings.variables.extend(parse_dotenv(text).context("parsing --variables")?);
    }
    if let Some(text) = secrets {
        settings.secrets.extend(parse_dotenv(text).context("parsing --secrets")?);
    }
    Ok(settings)
}

/// Split `KEY=VALUE`.
pub fn parse_assignment(s: &str) -> anyhow::Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => anyhow::bail!("expected KEY=VALUE, got '{s}'"),
    }
}
