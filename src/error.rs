//! Shell error types

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::client::ClientError;
use crate::core::resolver::ResolveError;
use crate::yaml::ConfigSyntaxError;

/// Errors surfaced by the shell
///
/// `Argument` errors are reported by clap itself (exit code 2, or 0 for
/// `--version`); every other variant reaches the top-level handler in
/// `main` and exits with code 1.
#[derive(Debug, Error, Diagnostic)]
pub enum ShellError {
    #[error(transparent)]
    #[diagnostic(code(rallyclient::args))]
    Argument(#[from] clap::Error),

    #[error("'{name}' is not a valid subcommand")]
    #[diagnostic(
        code(rallyclient::help::unknown_command),
        help("Run `rallyclient help` to list the available subcommands")
    )]
    CommandLookup { name: String },

    #[error("Command '{name}' is registered more than once")]
    #[diagnostic(code(rallyclient::registry::duplicate))]
    DuplicateCommand { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigSyntaxError),

    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(rallyclient::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    #[diagnostic(code(rallyclient::output))]
    Output(#[from] std::io::Error),
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;
