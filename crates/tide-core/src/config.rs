//! tide.toml configuration parser and resolved runtime settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default prefix tried when inferring environment variable names.
pub const DEFAULT_ENV_PREFIX: &str = "DEPLOYMENT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TideConfig {
    pub stack: StackConfig,
    pub variables: Option<VariablesConfig>,
    pub monitor: Option<MonitorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    pub version: Option<String>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariablesConfig {
    pub strict: Option<bool>,
    pub prefix: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub env_files: Option<Vec<PathBuf>>,
    pub secret_files: Option<Vec<PathBuf>>,
    pub values: Option<BTreeMap<String, String>>,
    pub secrets: Option<BTreeMap<String, String>>,
    pub extra: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub enabled: Option<bool>,
    pub timeout: Option<String>,
    pub interval: Option<String>,
    pub log_tail: Option<u32>,
}

impl TideConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Rollout monitoring parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub timeout: Duration,
    pub interval: Duration,
    /// Log lines fetched per service when collecting diagnostics.
    pub log_tail: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(5),
            log_tail: 100,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub stack: String,
    pub version: String,
    /// Directory for inferred `{name}.secret` files and generated files.
    pub work_dir: PathBuf,
    /// Fail on missing file sources and undefined references.
    pub strict_variables: bool,
    pub env_prefix: String,
    /// Lowest input layer above the process environment.
    pub variables: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
    /// Highest layer, immune to exclusions.
    pub extra_variables: BTreeMap<String, String>,
    pub exclude_variables: Vec<String>,
    /// Dotenv files layered at `variables` priority.
    pub env_files: Vec<PathBuf>,
    /// Dotenv files layered at `secrets` priority.
    pub secret_files: Vec<PathBuf>,
    pub monitor: MonitorSettings,
}

impl Settings {
    pub fn new(stack: &str, version: &str) -> Self {
        Self {
            stack: stack.to_string(),
            version: version.to_string(),
            work_dir: PathBuf::from("."),
            strict_variables: true,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            variables: BTreeMap::new(),
            secrets: BTreeMap::new(),
            extra_variables: BTreeMap::new(),
            exclude_variables: Vec::new(),
            env_files: Vec::new(),
            secret_files: Vec::new(),
            monitor: MonitorSettings::default(),
        }
    }

    /// Resolve a parsed config. Relative paths are anchored at `base_dir`
    /// (usually the directory holding tide.toml).
    pub fn from_config(config: TideConfig, base_dir: &Path) -> ConfigResult<Self> {
        let stack = config.stack.name.trim().to_string();
        if stack.is_empty() {
            return Err(ConfigError::Invalid("stack.name must not be empty".into()));
        }
        let version = config.stack.version.unwrap_or_else(default_version);
        let mut settings = Self::new(&stack, &version);

        settings.work_dir = match config.stack.work_dir {
            Some(dir) => base_dir.join(dir),
            None => base_dir.to_path_buf(),
        };

        if let Some(vars) = config.variables {
            if let Some(strict) = vars.strict {
                settings.strict_variables = strict;
            }
            if let Some(prefix) = vars.prefix {
                settings.env_prefix = prefix;
            }
            settings.exclude_variables = vars.exclude.unwrap_or_default();
            settings.env_files = anchor(base_dir, vars.env_files.unwrap_or_default());
            settings.secret_files = anchor(base_dir, vars.secret_files.unwrap_or_default());
            settings.variables = vars.values.unwrap_or_default();
            settings.secrets = vars.secrets.unwrap_or_default();
            settings.extra_variables = vars.extra.unwrap_or_default();
        }

        if let Some(monitor) = config.monitor {
            if let Some(enabled) = monitor.enabled {
                settings.monitor.enabled = enabled;
            }
            if let Some(timeout) = monitor.timeout {
                settings.monitor.timeout = parse_duration(&timeout)?;
            }
            if let Some(interval) = monitor.interval {
                settings.monitor.interval = parse_duration(&interval)?;
            }
            if let Some(tail) = monitor.log_tail {
                settings.monitor.log_tail = tail;
            }
        }

        if settings.monitor.interval.is_zero() {
            return Err(ConfigError::Invalid("monitor.interval must be positive".into()));
        }
        Ok(settings)
    }

    /// Load and resolve a tide.toml file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let config = TideConfig::from_file(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_config(config, base_dir)
    }
}

fn anchor(base_dir: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|p| base_dir.join(p)).collect()
}

/// Timestamp-based version used when none is configured.
pub fn default_version() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// Parse `500ms`, `5s`, `10m`, `1h`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = number.parse().map_err(|_| invalid())?;
    let seconds = |factor: u64| value.checked_mul(factor).map(Duration::from_secs).ok_or_else(invalid);
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => seconds(60),
        "h" => seconds(3600),
        _ => Err(invalid()),
    }
}

/// Parse dotenv-formatted text (`KEY=VALUE` lines, comments, quotes).
pub fn parse_dotenv(text: &str) -> ConfigResult<BTreeMap<String, String>> {
    dotenvy::from_read_iter(text.as_bytes())
        .map(|item| item.map_err(|e| ConfigError::Dotenv(e.to_string())))
        .collect()
}
