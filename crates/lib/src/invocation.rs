//! Argument assembly for the sandboxing tool.
//!
//! An [`Invocation`] is the fully-resolved program plus argument vector for
//! one child process. Building one is pure; nothing is spawned here. The
//! sandboxed form maps the package list to `-p <pkg>` pairs and hands the
//! inner command to the tool via `--run`, matching `nix-shell`'s interface.

use std::path::{Path, PathBuf};

use crate::config::EnvSpec;

/// A resolved program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: PathBuf,
  pub args: Vec<String>,
}

impl Invocation {
  /// Invocation of the sandboxing tool that provisions `env` and then runs
  /// `cmd` inside the resulting environment.
  pub fn sandboxed(tool: &Path, env: &EnvSpec, cmd: &str) -> Self {
    let mut args = Vec::with_capacity(env.packages.len() * 2 + 3);
    for package in &env.packages {
      args.push("-p".to_string());
      args.push(package.clone());
    }
    if env.pure {
      args.push("--pure".to_string());
    }
    args.push("--run".to_string());
    args.push(cmd.to_string());
    Self {
      program: tool.to_path_buf(),
      args,
    }
  }

  /// Invocation that runs `cmd` unmodified through the platform shell.
  /// Used when the package list is empty and there is nothing to provision.
  pub fn direct(cmd: &str) -> Self {
    let (shell, mut args) = platform_shell();
    args.push(cmd.to_string());
    Self {
      program: PathBuf::from(shell),
      args,
    }
  }

  /// The invocation that `cmd` would run as, without locating the tool.
  /// Used for dry-run display; a sandboxed preview shows the tool name as
  /// configured rather than a resolved path.
  pub fn preview(env: &EnvSpec, cmd: &str) -> Self {
    if env.packages.is_empty() {
      Self::direct(cmd)
    } else {
      Self::sandboxed(Path::new(&env.tool), env, cmd)
    }
  }

  /// Render as a copy-pasteable shell line for dry-run display.
  pub fn render(&self) -> String {
    let mut line = shell_quote(&self.program.display().to_string());
    for arg in &self.args {
      line.push(' ');
      line.push_str(&shell_quote(arg));
    }
    line
  }
}

impl std::fmt::Display for Invocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.render())
  }
}

/// Locate the sandboxing tool on PATH (or verify an explicit path).
pub fn locate_tool(tool: &str) -> Result<PathBuf, which::Error> {
  which::which(tool)
}

/// The shell used for direct execution.
///
/// Always `/bin/sh` on Unix rather than `$SHELL`: interactive shells source
/// profile files that modify the environment, which would make the two
/// execution paths behave differently.
fn platform_shell() -> (&'static str, Vec<String>) {
  #[cfg(unix)]
  {
    ("/bin/sh", vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe",
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}

/// Quote a single argument for display in a shell line.
fn shell_quote(arg: &str) -> String {
  let safe = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "_-./=:@+,".contains(c));
  if safe {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn env(packages: &[&str], pure: bool) -> EnvSpec {
    EnvSpec {
      packages: packages.iter().map(|p| p.to_string()).collect(),
      pure,
      tool: "nix-shell".to_string(),
    }
  }

  #[test]
  fn sandboxed_args_in_order() {
    let inv = Invocation::sandboxed(
      Path::new("nix-shell"),
      &env(&["zlib", "openssl"], false),
      "cargo build",
    );
    assert_eq!(
      inv.args,
      vec!["-p", "zlib", "-p", "openssl", "--run", "cargo build"]
    );
  }

  #[test]
  fn pure_flag_before_run() {
    let inv = Invocation::sandboxed(Path::new("nix-shell"), &env(&["zlib"], true), "true");
    assert_eq!(inv.args, vec!["-p", "zlib", "--pure", "--run", "true"]);
  }

  #[test]
  fn empty_package_list_still_builds() {
    let inv = Invocation::sandboxed(Path::new("nix-shell"), &env(&[], false), "true");
    assert_eq!(inv.args, vec!["--run", "true"]);
  }

  #[test]
  #[cfg(unix)]
  fn direct_uses_the_platform_shell() {
    let inv = Invocation::direct("exit 7");
    assert_eq!(inv.program, PathBuf::from("/bin/sh"));
    assert_eq!(inv.args, vec!["-c", "exit 7"]);
  }

  #[test]
  fn render_quotes_the_inner_command() {
    let inv = Invocation::sandboxed(Path::new("nix-shell"), &env(&["zlib"], false), "cargo build");
    assert_eq!(inv.render(), "nix-shell -p zlib --run 'cargo build'");
  }

  #[test]
  fn render_escapes_single_quotes() {
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("plain-arg.txt"), "plain-arg.txt");
  }
}
