//! Version 1 of the Rally API: HTTP client and deployment commands

pub mod client;
pub mod deployment_shell;

pub use client::{connect, HttpClient};

use crate::cli::registry::CommandSource;

/// Command modules of the version 1 shell
pub const COMMAND_MODULES: &[&(dyn CommandSource + Sync)] = &[&deployment_shell::DeploymentShell];
