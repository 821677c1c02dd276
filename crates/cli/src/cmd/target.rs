//! Implementation of the `sbx build`, `sbx run` and `sbx target` commands.
//!
//! All three run a named target's inner command through the runner; `build`
//! and `run` are just the two canonical target names.

use anyhow::Result;

use shellbox_lib::{Config, Invocation, runner};

pub async fn cmd_target(config: &Config, name: &str, dry_run: bool) -> Result<()> {
  if dry_run {
    let cmd = config.target(name)?;
    println!("{}", Invocation::preview(&config.env, cmd));
    return Ok(());
  }

  runner::run_target(config, name).await?;
  Ok(())
}
