use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tide_core::{Layer, VariableEnvironment};
use tide_vars::build_environment;

use super::{load_settings, parse_assignment};

pub struct InterpolateArgs<'a> {
    pub text: Option<&'a str>,
    pub file: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub vars: &'a [String],
    pub strict: bool,
}

/// Interpolate text from the argument, a file, or stdin.
pub fn interpolate(args: InterpolateArgs<'_>) -> anyhow::Result<()> {
    let input = match (args.text, args.file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let mut env = match args.config {
        Some(config) => build_environment(&load_settings(config, None, None, None)?, std::env::vars())?,
        None => {
            let mut env = VariableEnvironment::new();
            env.layer(Layer::Process, std::env::vars());
            env
        }
    };
    let overrides = args
        .vars
        .iter()
        .map(|v| parse_assignment(v))
        .collect::<anyhow::Result<Vec<_>>>()?;
    env.layer(Layer::Extra, overrides);

    print!("{}", tide_interp::interpolate(&input, &env, args.strict)?);
    Ok(())
}
