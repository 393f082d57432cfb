//! Parser builder
//!
//! Turns discovered [`CommandSpec`]s into a clap command tree: the base
//! parser holding the global options, one subcommand per discovered
//! command, and the `help` and `bash-completion` built-ins.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;

use crate::cli::args::{global_args, PROG};
use crate::cli::discovery::CommandSpec;
use crate::cli::registry::{declare_argument, ArgOptions, Handler};
use crate::core::config::Settings;
use crate::error::{Result, ShellError};

const ABOUT: &str = "Command-line interface to the Rally API.";
const EPILOG: &str = "See \"rallyclient help COMMAND\" for help on a specific command.";

pub const HELP_COMMAND: &str = "help";
pub const COMPLETION_COMMAND: &str = "bash-completion";
pub const COMPLETION_ALIAS: &str = "bash_completion";

/// Commands handled by the shell itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    BashCompletion,
}

/// What runs when a subcommand is selected
#[derive(Clone, Copy)]
pub enum Binding {
    Builtin(Builtin),
    Handler(Handler),
}

/// A subcommand's parser and its binding
#[derive(Clone)]
pub struct Subcommand {
    pub command: Command,
    pub binding: Binding,
}

/// Every accepted command spelling, mapped to its parser
#[derive(Clone, Default)]
pub struct SubcommandRegistry {
    entries: BTreeMap<String, Subcommand>,
}

impl SubcommandRegistry {
    fn insert(&mut self, name: &str, subcommand: Subcommand) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(ShellError::DuplicateCommand {
                name: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), subcommand);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Subcommand> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subcommand)> {
        self.entries.iter().map(|(name, sub)| (name.as_str(), sub))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The full command-line parser
#[derive(Clone)]
pub struct Parser {
    command: Command,
    subcommands: SubcommandRegistry,
}

impl Parser {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn subcommands(&self) -> &SubcommandRegistry {
        &self.subcommands
    }

    /// Parse a raw argument list (without the program name)
    pub fn parse(&self, argv: &[String]) -> Result<ArgMatches> {
        let matches = self
            .command
            .clone()
            .try_get_matches_from(std::iter::once(PROG.to_string()).chain(argv.iter().cloned()))?;
        Ok(matches)
    }
}

/// The base parser: global options only
pub fn base_parser(settings: &Settings) -> Command {
    Command::new(PROG)
        .about(ABOUT)
        .after_help(EPILOG)
        .version(env!("CARGO_PKG_VERSION"))
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .args(global_args(settings))
}

/// The hidden `-h/--help` every subcommand accepts
fn subcommand_help_arg() -> Arg {
    Arg::new("help")
        .short('h')
        .long("help")
        .action(ArgAction::SetTrue)
        .hide(true)
}

fn subcommand(name: &str, help: &str, description: &str) -> Command {
    let mut cmd = Command::new(name.to_string())
        .about(help.to_string())
        .disable_help_flag(true)
        .arg(subcommand_help_arg());
    if !description.is_empty() && description != help {
        cmd = cmd.long_about(description.to_string());
    }
    cmd
}

fn help_builtin() -> Command {
    subcommand(
        HELP_COMMAND,
        "Display help about this program or one of its subcommands.",
        "",
    )
    .arg(
        declare_argument(
            ["command"],
            ArgOptions::new()
                .metavar("<subcommand>")
                .help("Display help for <subcommand>"),
        )
        .to_arg(),
    )
}

fn completion_builtin() -> Command {
    subcommand(
        COMPLETION_COMMAND,
        "Prints all of the commands and options to stdout.",
        "Prints all of the commands and options to stdout.\n\n\
         The bash completion script doesn't have to hard code them.",
    )
    .alias(COMPLETION_ALIAS)
    .hide(true)
}

/// Build the full parser from the global options and discovered commands
///
/// Arguments are added in declaration order. A command shadowing a built-in
/// is rejected like any other duplicate.
pub fn build_parser(settings: &Settings, commands: &[CommandSpec]) -> Result<Parser> {
    let mut registry = SubcommandRegistry::default();
    let mut parser = base_parser(settings)
        .subcommand_required(true)
        .subcommand_value_name("<subcommand>");

    for spec in commands {
        let cmd = spec
            .arguments
            .iter()
            .fold(subcommand(&spec.name, &spec.help, &spec.description), |cmd, arg| {
                cmd.arg(arg.to_arg())
            });

        registry.insert(
            &spec.name,
            Subcommand {
                command: cmd.clone(),
                binding: Binding::Handler(spec.handler),
            },
        )?;
        parser = parser.subcommand(cmd);
    }

    let help = Subcommand {
        command: help_builtin(),
        binding: Binding::Builtin(Builtin::Help),
    };
    registry.insert(HELP_COMMAND, help.clone())?;
    parser = parser.subcommand(help.command);

    let completion = Subcommand {
        command: completion_builtin(),
        binding: Binding::Builtin(Builtin::BashCompletion),
    };
    registry.insert(COMPLETION_COMMAND, completion.clone())?;
    registry.insert(COMPLETION_ALIAS, completion.clone())?;
    parser = parser.subcommand(completion.command);

    tracing::debug!(subcommands = registry.len(), "built parser");

    Ok(Parser {
        command: parser,
        subcommands: registry,
    })
}
