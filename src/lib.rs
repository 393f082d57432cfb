//! rallyclient: command-line shell for the Rally deployment API
//!
//! Subcommands are not hard-coded. Each API version registers command
//! modules whose `do_*` handlers are discovered at start-up and turned into
//! a clap parser, so the command set follows the version selected with
//! `--rally-api-version`.

pub mod cli;
pub mod client;
pub mod core;
pub mod error;
pub mod v1;
pub mod yaml;

pub use error::{Result, ShellError};
