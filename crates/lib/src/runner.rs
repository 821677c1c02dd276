//! Spawning the provisioned child process.
//!
//! One invocation means one child: locate the tool, verify that the package
//! list resolves, then run the inner command with inherited stdio and wait.
//! The child's exit status is carried back verbatim in [`RunnerError`] so
//! the binary can exit with the same code. No recovery is attempted at any
//! step; failures surface to the caller as-is.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{Config, ConfigError, EnvSpec};
use crate::invocation::{self, Invocation};

/// Errors that can occur while running a target.
#[derive(Debug, Error)]
pub enum RunnerError {
  /// Config loading or target lookup failed.
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// The sandboxing tool is not on PATH (or the configured path is not
  /// an executable).
  #[error("sandboxing tool not found: {tool}")]
  ToolNotFound { tool: String },

  /// The tool could not resolve one or more declared packages. The inner
  /// command was never spawned.
  #[error("{tool} failed to resolve the declared packages: {detail}")]
  Unresolvable { tool: String, detail: String },

  /// The inner command ran and exited non-zero.
  #[error("command failed with exit code {code}: {cmd}")]
  CommandFailed { cmd: String, code: i32 },

  /// I/O error while spawning or waiting.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl RunnerError {
  /// The process exit code this error maps to. Inner-command failures
  /// propagate the child's own code; a missing tool exits 127 as shells do.
  pub fn exit_code(&self) -> i32 {
    match self {
      RunnerError::CommandFailed { code, .. } => *code,
      RunnerError::ToolNotFound { .. } => 127,
      _ => 1,
    }
  }
}

/// Run a named target from the config.
pub async fn run_target(config: &Config, name: &str) -> Result<(), RunnerError> {
  let cmd = config.target(name)?;
  info!(target = %name, cmd = %cmd, "running target");
  run_command(&config.env, cmd).await
}

/// Run an inner command in the provisioned environment.
///
/// With an empty package list there is nothing to provision and the command
/// runs unmodified through the platform shell. Otherwise the tool is located
/// and the package list verified before the real child is spawned, so a bad
/// package name can never trigger the inner command's side effects.
pub async fn run_command(env: &EnvSpec, cmd: &str) -> Result<(), RunnerError> {
  let invocation = prepare(env, cmd).await?;
  execute(&invocation, cmd).await
}

/// Resolve the invocation for `cmd`: tool lookup plus resolution pre-flight.
pub async fn prepare(env: &EnvSpec, cmd: &str) -> Result<Invocation, RunnerError> {
  if env.packages.is_empty() {
    debug!("no packages declared, running unsandboxed");
    return Ok(Invocation::direct(cmd));
  }

  let tool = invocation::locate_tool(&env.tool).map_err(|_| RunnerError::ToolNotFound {
    tool: env.tool.clone(),
  })?;

  verify_resolution(&tool, env).await?;
  Ok(Invocation::sandboxed(&tool, env, cmd))
}

/// Probe the tool with the package list and a no-op inner command.
///
/// A failing probe means resolution failed, and its stderr is the tool's
/// own diagnostic. The probe shares the tool's package cache with the real
/// invocation, so a successful probe makes the second resolution cheap.
async fn verify_resolution(tool: &Path, env: &EnvSpec) -> Result<(), RunnerError> {
  debug!(
    tool = %tool.display(),
    packages = env.packages.len(),
    "verifying package resolution"
  );

  let probe = Invocation::sandboxed(tool, env, ":");
  let output = Command::new(&probe.program)
    .args(&probe.args)
    .stdin(Stdio::null())
    .output()
    .await?;

  if !output.status.success() {
    let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
    return Err(RunnerError::Unresolvable {
      tool: env.tool.clone(),
      detail,
    });
  }
  Ok(())
}

/// Spawn the child with inherited stdio and wait for it.
async fn execute(invocation: &Invocation, cmd: &str) -> Result<(), RunnerError> {
  debug!(program = %invocation.program.display(), "spawning process");

  let status = Command::new(&invocation.program)
    .args(&invocation.args)
    .status()
    .await?;

  if status.success() {
    return Ok(());
  }
  Err(RunnerError::CommandFailed {
    cmd: cmd.to_string(),
    code: exit_code_of(status),
  })
}

/// Map an exit status to a code, using 128+signal for signal-terminated
/// children as shells report them.
fn exit_code_of(status: ExitStatus) -> i32 {
  if let Some(code) = status.code() {
    return code;
  }
  #[cfg(unix)]
  {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
      return 128 + signal;
    }
  }
  1
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  fn unsandboxed_env() -> EnvSpec {
    EnvSpec {
      packages: vec![],
      pure: false,
      tool: "nix-shell".to_string(),
    }
  }

  fn env_with_tool(packages: &[&str], tool: &str) -> EnvSpec {
    EnvSpec {
      packages: packages.iter().map(|p| p.to_string()).collect(),
      pure: false,
      tool: tool.to_string(),
    }
  }

  /// Write an executable shell script and return its path.
  #[cfg(unix)]
  fn write_tool(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  /// A stand-in for the sandboxing tool: skips the package arguments and
  /// runs whatever follows `--run` through the shell.
  #[cfg(unix)]
  const FAKE_TOOL: &str = r#"#!/bin/sh
while [ "$1" != "--run" ]; do shift; done
shift
exec /bin/sh -c "$1"
"#;

  #[cfg(unix)]
  const FAILING_RESOLVER: &str = r#"#!/bin/sh
echo "error: undefined variable 'nonexistent-pkg-xyz'" >&2
exit 1
"#;

  #[tokio::test]
  async fn unsandboxed_success() {
    run_command(&unsandboxed_env(), "exit 0").await.unwrap();
  }

  #[tokio::test]
  async fn unsandboxed_propagates_exit_code() {
    let err = run_command(&unsandboxed_env(), "exit 7").await.unwrap_err();
    assert!(matches!(err, RunnerError::CommandFailed { code: 7, .. }));
    assert_eq!(err.exit_code(), 7);
  }

  #[tokio::test]
  async fn empty_package_list_never_needs_the_tool() {
    // Tool does not exist, but with nothing to provision it is never looked up.
    let env = env_with_tool(&[], "/no/such/tool-anywhere");
    run_command(&env, "exit 0").await.unwrap();
  }

  #[tokio::test]
  async fn missing_tool_is_reported() {
    let env = env_with_tool(&["zlib"], "shellbox-test-no-such-tool-xyz");
    let err = run_command(&env, "exit 0").await.unwrap_err();
    assert!(matches!(err, RunnerError::ToolNotFound { .. }));
    assert_eq!(err.exit_code(), 127);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn sandboxed_success_through_fake_tool() {
    let temp = tempfile::TempDir::new().unwrap();
    let tool = write_tool(temp.path(), "fake-nix-shell", FAKE_TOOL);
    let env = env_with_tool(&["zlib", "openssl"], tool.to_str().unwrap());

    run_command(&env, "exit 0").await.unwrap();
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn sandboxed_propagates_exit_code() {
    let temp = tempfile::TempDir::new().unwrap();
    let tool = write_tool(temp.path(), "fake-nix-shell", FAKE_TOOL);
    let env = env_with_tool(&["zlib"], tool.to_str().unwrap());

    let err = run_command(&env, "exit 7").await.unwrap_err();
    assert!(matches!(err, RunnerError::CommandFailed { code: 7, .. }));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn failed_resolution_blocks_the_inner_command() {
    let temp = tempfile::TempDir::new().unwrap();
    let tool = write_tool(temp.path(), "failing-resolver", FAILING_RESOLVER);
    let env = env_with_tool(&["nonexistent-pkg-xyz"], tool.to_str().unwrap());

    let marker = temp.path().join("marker");
    let cmd = format!("touch {}", marker.display());
    let err = run_command(&env, &cmd).await.unwrap_err();

    match err {
      RunnerError::Unresolvable { detail, .. } => {
        assert!(detail.contains("nonexistent-pkg-xyz"));
      }
      other => panic!("expected Unresolvable, got {:?}", other),
    }
    // The probe failed, so the real command must never have run.
    assert!(!marker.exists());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn signal_termination_maps_to_128_plus_signal() {
    let err = run_command(&unsandboxed_env(), "kill -9 $$").await.unwrap_err();
    assert!(matches!(err, RunnerError::CommandFailed { code: 137, .. }));
  }

  #[tokio::test]
  async fn run_target_looks_up_the_command() {
    let config = Config {
      env: unsandboxed_env(),
      targets: BTreeMap::from([("check".to_string(), "exit 0".to_string())]),
    };
    run_target(&config, "check").await.unwrap();

    let err = run_target(&config, "deploy").await.unwrap_err();
    assert!(matches!(
      err,
      RunnerError::Config(ConfigError::UnknownTarget(_))
    ));
  }
}
