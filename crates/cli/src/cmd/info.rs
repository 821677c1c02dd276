//! Implementation of the `sbx info` command.
//!
//! Shows the resolved environment and target table without running anything.
//! The tool is looked up on PATH so a missing installation is visible here
//! instead of at the first `sbx build`.

use anyhow::Result;
use owo_colors::OwoColorize;

use shellbox_lib::{Config, invocation};

use crate::output::OutputFormat;

pub fn cmd_info(config: &Config, format: OutputFormat) -> Result<()> {
  let tool_path = invocation::locate_tool(&config.env.tool).ok();

  if format.is_json() {
    let report = serde_json::json!({
      "tool": config.env.tool,
      "tool_path": tool_path.as_ref().map(|p| p.display().to_string()),
      "pure": config.env.pure,
      "packages": config.env.packages,
      "targets": config.targets,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("{} sbx v{}", "::".cyan().bold(), env!("CARGO_PKG_VERSION"));
  println!();
  match &tool_path {
    Some(path) => println!("  Tool:     {} ({})", config.env.tool, path.display()),
    None => println!("  Tool:     {} ({})", config.env.tool, "not found".red()),
  }
  println!("  Pure:     {}", config.env.pure);
  if config.env.packages.is_empty() {
    println!("  Packages: (none, commands run unsandboxed)");
  } else {
    println!("  Packages:");
    for package in &config.env.packages {
      println!("    - {}", package);
    }
  }
  println!("  Targets:");
  for (name, cmd) in &config.targets {
    println!("    {} {}", format!("{}:", name).bold(), cmd);
  }

  Ok(())
}
