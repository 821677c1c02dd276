//! shellbox-lib: Core types and logic for shellbox
//!
//! This crate provides the pieces behind the `sbx` binary:
//! - `Config`: the declared package list and target table
//! - `Invocation`: argument assembly for the sandboxing tool
//! - `runner`: spawning the provisioned child process and propagating its exit

pub mod config;
pub mod invocation;
pub mod runner;

pub use config::{Config, ConfigError, EnvSpec};
pub use invocation::Invocation;
pub use runner::{RunnerError, run_command, run_target};
