use std::path::Path;

use anyhow::Context;
use tide_core::StackSpec;
use tide_vars::build_environment;
use tracing::info;

use super::load_settings;

pub struct ReconcileArgs<'a> {
    pub config: &'a Path,
    pub stack_file: &'a Path,
    pub output: Option<&'a Path>,
    pub version: Option<&'a str>,
    pub variables: Option<&'a str>,
    pub secrets: Option<&'a str>,
    pub lenient: bool,
}

/// Resolve a stack file and write the result as YAML.
///
/// Generated files are kept: the output references them.
pub fn reconcile(args: ReconcileArgs<'_>) -> anyhow::Result<()> {
    let mut settings = load_settings(args.config, args.version, args.variables, args.secrets)?;
    if args.lenient {
        settings.strict_variables = false;
    }
    let env = build_environment(&settings, std::env::vars())?;

    let text = std::fs::read_to_string(args.stack_file)
        .with_context(|| format!("reading {}", args.stack_file.display()))?;
    let spec: StackSpec = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing {}", args.stack_file.display()))?;

    let resolved = tide_vars::reconcile(&spec, &settings, &env)?;
    let yaml = serde_yaml::to_string(&resolved.spec)?;

    match args.output {
        Some(path) => {
            std::fs::write(path, &yaml).with_context(|| format!("writing {}", path.display()))?;
            info!(
                stack = %settings.stack,
                output = %path.display(),
                generated = resolved.generated_files().count(),
                "resolved stack written"
            );
        }
        None => print!("{yaml}"),
    }

    for variable in &resolved.variables {
        info!(kind = %variable.kind, variable = %variable.logical_name, name = %variable.name, "materialized");
    }
    Ok(())
}
