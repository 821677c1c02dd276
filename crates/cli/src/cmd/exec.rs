//! Implementation of the `sbx exec` command.

use anyhow::{Result, bail};

use shellbox_lib::{Config, Invocation, runner};

pub async fn cmd_exec(config: &Config, cmd: &str, dry_run: bool) -> Result<()> {
  if cmd.trim().is_empty() {
    bail!("empty command");
  }

  if dry_run {
    println!("{}", Invocation::preview(&config.env, cmd));
    return Ok(());
  }

  runner::run_command(&config.env, cmd).await?;
  Ok(())
}
