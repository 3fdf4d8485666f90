use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "tide",
    about = "Tideway — stack rollouts with content-addressed secrets and configs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve `$NAME` / `${NAME...}` references in text.
    ///
    /// Reads TEXT, or --file, or stdin. Without --config only the process
    /// environment and --var assignments are available.
    Interpolate {
        text: Option<String>,
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Build the environment from this tide.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Extra KEY=VALUE assignment (highest priority, repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// Fail on undefined references
        #[arg(long)]
        strict: bool,
    },
    /// Resolve a stack file: interpolate services and materialize
    /// secrets and configs. Prints YAML unless --output is given.
    Reconcile {
        #[arg(short, long, default_value = "tide.toml")]
        config: PathBuf,
        #[arg(short, long)]
        stack_file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the deployment version
        #[arg(long)]
        deploy_version: Option<String>,
        /// Dotenv text layered as variables
        #[arg(long)]
        variables: Option<String>,
        /// Dotenv text layered as secrets
        #[arg(long)]
        secrets: Option<String>,
        /// Treat missing file sources and undefined references as soft
        #[arg(long)]
        lenient: bool,
    },
    /// Show the layered variable environment.
    Env {
        #[arg(short, long, default_value = "tide.toml")]
        config: PathBuf,
        #[arg(long)]
        variables: Option<String>,
        #[arg(long)]
        secrets: Option<String>,
        /// Include process environment entries
        #[arg(long)]
        all: bool,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("tide=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Interpolate {
            text,
            file,
            config,
            vars,
            strict,
        } => commands::interpolate::interpolate(commands::interpolate::InterpolateArgs {
            text: text.as_deref(),
            file: file.as_deref(),
            config: config.as_deref(),
            vars: &vars,
            strict,
        }),
        Commands::Reconcile {
            config,
            stack_file,
            output,
            deploy_version,
            variables,
            secrets,
            lenient,
        } => commands::reconcile::reconcile(commands::reconcile::ReconcileArgs {
            config: &config,
            stack_file: &stack_file,
            output: output.as_deref(),
            version: deploy_version.as_deref(),
            variables: variables.as_deref(),
            secrets: secrets.as_deref(),
            lenient,
        }),
        Commands::Env {
            config,
            variables,
            secrets,
            all,
        } => commands::env::env(&config, variables.as_deref(), secrets.as_deref(), all),
    }
}
