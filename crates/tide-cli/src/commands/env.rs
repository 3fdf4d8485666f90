use std::path::Path;

use tide_core::{Layer, VariableEnvironment};
use tide_vars::build_environment;

use super::load_settings;

const MASK: &str = "********";

/// Print the layered environment. Secrets-layer values are masked and
/// process entries are only listed with `all`.
pub fn env(config: &Path, variables: Option<&str>, secrets: Option<&str>, all: bool) -> anyhow::Result<()> {
    let settings = load_settings(config, None, variables, secrets)?;
    let env = build_environment(&settings, std::env::vars())?;
    for line in render(&env, all) {
        println!("{line}");
    }
    Ok(())
}

fn render(env: &VariableEnvironment, all: bool) -> Vec<String> {
    let entries: Vec<_> = env
        .iter()
        .filter(|(_, _, layer)| all || *layer != Layer::Process)
        .collect();
    let width = entries.iter().map(|(name, _, _)| name.len()).max().unwrap_or(0);
    entries
        .into_iter()
        .map(|(name, value, layer)| {
            let shown = if layer == Layer::Secrets { MASK } else { value };
            format!("{name:<width$}  {:<9}  {shown}", layer.as_str())
        })
        .collect()
}
