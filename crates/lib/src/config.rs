//! Configuration file loading.
//!
//! A `shellbox.toml` in the working directory declares the package list
//! handed to the sandboxing tool and the table of named targets. When no
//! file exists, built-in defaults cover the common case of building a
//! cargo project that links native libraries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_FILE_NAME: &str = "shellbox.toml";

/// Default sandboxing tool.
pub const DEFAULT_TOOL: &str = "nix-shell";

/// Errors that can occur while loading a config.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  /// The config file is not valid TOML (or has the wrong shape).
  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    source: toml::de::Error,
  },

  /// A target name was requested that the config does not define.
  #[error("unknown target: {0}")]
  UnknownTarget(String),

  /// A target maps to an empty command string.
  #[error("target {0} has an empty command")]
  EmptyCommand(String),
}

/// The provisioned environment: which packages the sandboxing tool must
/// resolve before the inner command runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvSpec {
  /// Package identifiers, passed verbatim to the tool.
  pub packages: Vec<String>,

  /// Run the tool in pure mode (drop the ambient environment).
  pub pure: bool,

  /// Name or path of the sandboxing tool.
  pub tool: String,
}

impl Default for EnvSpec {
  fn default() -> Self {
    Self {
      packages: default_packages(),
      pure: false,
      tool: DEFAULT_TOOL.to_string(),
    }
  }
}

/// Packages a cargo project with native TLS and compression typically
/// needs. The Apple Security framework only resolves on macOS.
fn default_packages() -> Vec<String> {
  let mut packages = vec![
    "zlib".to_string(),
    "libiconv".to_string(),
    "openssl".to_string(),
    "pkg-config".to_string(),
  ];
  if cfg!(target_os = "macos") {
    packages.push("darwin.apple_sdk.frameworks.Security".to_string());
  }
  packages
}

fn default_targets() -> BTreeMap<String, String> {
  BTreeMap::from([
    ("build".to_string(), "cargo build".to_string()),
    ("run".to_string(), "cargo run".to_string()),
  ])
}

/// The full config: environment spec plus the target table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub env: EnvSpec,

  /// Named targets mapping to inner command strings.
  pub targets: BTreeMap<String, String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      env: EnvSpec::default(),
      targets: default_targets(),
    }
  }
}

impl Config {
  /// Load a config from an explicit path.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(config)
  }

  /// Resolve a config: an explicit path must exist; otherwise the
  /// working-directory file is used when present, falling back to the
  /// built-in defaults.
  pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    match explicit {
      Some(path) => Self::load(path),
      None => {
        let default_path = Path::new(DEFAULT_FILE_NAME);
        if default_path.exists() {
          Self::load(default_path)
        } else {
          Ok(Self::default())
        }
      }
    }
  }

  /// Look up a target's inner command.
  pub fn target(&self, name: &str) -> Result<&str, ConfigError> {
    let cmd = self
      .targets
      .get(name)
      .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))?;
    if cmd.trim().is_empty() {
      return Err(ConfigError::EmptyCommand(name.to_string()));
    }
    Ok(cmd)
  }
}
