use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use shellbox_lib::{Config, RunnerError};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::OutputFormat;

/// sbx - Run build targets inside a provisioned dependency environment
#[derive(Parser)]
#[command(name = "sbx")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: shellbox.toml when present)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Run the sandboxing tool in pure mode
  #[arg(long, global = true)]
  pure: bool,

  /// Print the invocation instead of executing it
  #[arg(long, global = true)]
  dry_run: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the build target
  Build,

  /// Run the run target
  Run,

  /// Run any named target from the config
  Target {
    /// Target name
    name: String,
  },

  /// Run an ad-hoc command in the provisioned environment
  Exec {
    /// Command and arguments, joined into one shell command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
  },

  /// Show the resolved environment and targets
  Info {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  if let Err(err) = dispatch(cli) {
    let code = exit_code_for(&err);
    // An inner-command failure already printed its own diagnostics through
    // the inherited streams; the wrapper only carries the code.
    if !is_command_failure(&err) {
      eprintln!("{} {:#}", "error:".red().bold(), err);
    }
    std::process::exit(code);
  }
}

fn dispatch(cli: Cli) -> Result<()> {
  let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load config")?;
  if cli.pure {
    config.env.pure = true;
  }
  tracing::debug!(
    packages = config.env.packages.len(),
    targets = config.targets.len(),
    "config resolved"
  );

  match cli.command {
    Commands::Info { format } => cmd::cmd_info(&config, format),
    Commands::Build => block_on_target(&config, "build", cli.dry_run),
    Commands::Run => block_on_target(&config, "run", cli.dry_run),
    Commands::Target { name } => block_on_target(&config, &name, cli.dry_run),
    Commands::Exec { command } => {
      let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
      rt.block_on(cmd::cmd_exec(&config, &command.join(" "), cli.dry_run))
    }
  }
}

fn block_on_target(config: &Config, name: &str, dry_run: bool) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(cmd::cmd_target(config, name, dry_run))
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
  err
    .downcast_ref::<RunnerError>()
    .map(|e| e.exit_code())
    .unwrap_or(1)
}

fn is_command_failure(err: &anyhow::Error) -> bool {
  matches!(
    err.downcast_ref::<RunnerError>(),
    Some(RunnerError::CommandFailed { .. })
  )
}
