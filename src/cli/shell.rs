//! The shell runtime
//!
//! One invocation walks through a fixed sequence: parse the global options
//! on their own, set up logging, print help if that is all that was asked
//! for, build the parser for the selected API version, parse the full
//! command line, then either run a built-in or construct the API client and
//! hand over to the command's handler.

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::time::Duration;

use crate::cli::args::{split_known_args, GlobalOpts, PROG};
use crate::cli::discovery::discover;
use crate::cli::help::HelpFormatter;
use crate::cli::parser::{
    base_parser, build_parser, Binding, Builtin, Parser, SubcommandRegistry, COMPLETION_ALIAS,
    COMPLETION_COMMAND,
};
use crate::cli::registry::Invocation;
use crate::client::{self, ClientConfig};
use crate::core::config::{Environment, Settings};
use crate::core::logging::setup_logging;
use crate::core::resolver;
use crate::error::{Result, ShellError};

/// Whether the raw arguments ask for debug output
///
/// Used by the entry point to pick the error report format, independent of
/// whether parsing got far enough to read the flag.
pub fn debug_requested(argv: &[String]) -> bool {
    argv.iter().any(|a| a == "-d" || a == "--debug")
}

/// Every option spelling a subcommand accepts
fn option_strings(arg: &Arg) -> Vec<String> {
    let mut strings = Vec::new();
    if let Some(short) = arg.get_short() {
        strings.push(format!("-{short}"));
    }
    for short in arg.get_all_short_aliases().unwrap_or_default() {
        strings.push(format!("-{short}"));
    }
    if let Some(long) = arg.get_long() {
        strings.push(format!("--{long}"));
    }
    for alias in arg.get_all_aliases().unwrap_or_default() {
        strings.push(format!("--{alias}"));
    }
    strings
}

/// Words offered by bash completion: subcommand names and their options
///
/// The completion command itself is left out under both spellings.
pub fn completion_words(registry: &SubcommandRegistry) -> BTreeSet<String> {
    let mut words = BTreeSet::new();
    for (name, subcommand) in registry.iter() {
        words.insert(name.to_string());
        for arg in subcommand.command.get_arguments() {
            words.extend(option_strings(arg));
        }
    }
    words.remove(COMPLETION_COMMAND);
    words.remove(COMPLETION_ALIAS);
    words
}

/// The command-line shell
pub struct Shell {
    settings: Settings,
    env: Environment,
}

impl Shell {
    /// A shell whose defaults come from the config file and `env`
    pub fn new(env: Environment) -> Self {
        let settings = Settings::load(&env);
        Self::with_settings(settings, env)
    }

    pub fn with_settings(settings: Settings, env: Environment) -> Self {
        Self { settings, env }
    }

    /// Whether debug output is on without any command-line flag
    pub fn debug_by_default(&self) -> bool {
        self.settings.debug
    }

    /// Run one invocation against stdout, returning the exit status
    pub fn main(&mut self, argv: &[String]) -> Result<u8> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run(argv, &mut out)
    }

    /// Run one invocation, writing command output to `out`
    pub fn run(&mut self, argv: &[String], out: &mut dyn Write) -> Result<u8> {
        let base = base_parser(&self.settings);
        let (known, deferred) = split_known_args(&base, argv);
        let matches = base.try_get_matches_from(std::iter::once(PROG.to_string()).chain(known))?;
        let global = GlobalOpts::from_matches(&matches, &self.settings);

        setup_logging(global.debug, global.verbose);
        tracing::debug!(?deferred, api_version = %global.api_version, "parsed global options");

        if global.help || argv.is_empty() {
            self.print_top_level_help(&global.api_version, out)?;
            return Ok(0);
        }

        let parser = self.get_subcommand_parser(&global.api_version)?;

        // Answered before the full parse so missing required options don't get in the way
        if let Some((name, subcommand)) =
            help_request(&deferred).and_then(|name| Some((name, parser.subcommands().get(name)?)))
        {
            let prog = format!("{PROG} {name}");
            write!(out, "{}", HelpFormatter::new(prog).format_help(&subcommand.command))?;
            return Ok(0);
        }

        let matches = parser.parse(argv)?;
        let global = GlobalOpts::from_matches(&matches, &self.settings);
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(parser
                .command()
                .clone()
                .error(ErrorKind::MissingSubcommand, "a subcommand is required")
                .into());
        };
        let subcommand = parser
            .subcommands()
            .get(name)
            .ok_or_else(|| ShellError::CommandLookup {
                name: name.to_string(),
            })?;

        match subcommand.binding {
            Binding::Builtin(Builtin::Help) => {
                self.do_help(&parser, sub_matches, out)?;
                Ok(0)
            }
            Binding::Builtin(Builtin::BashCompletion) => {
                let words: Vec<String> = completion_words(parser.subcommands()).into_iter().collect();
                writeln!(out, "{}", words.join(" "))?;
                Ok(0)
            }
            Binding::Handler(handler) => {
                let config = ClientConfig {
                    endpoint: global.rally_url.clone(),
                    timeout: Duration::from_secs(global.timeout),
                };
                let client = client::get_client(&global.api_version, &config)?;

                tracing::debug!(command = name, "running handler");
                let mut invocation = Invocation {
                    client: client.as_ref(),
                    args: sub_matches,
                    env: &self.env,
                    out,
                };
                handler(&mut invocation)
            }
        }
    }

    /// Discover the commands of `api_version` and build the full parser
    pub fn get_subcommand_parser(&self, api_version: &str) -> Result<Parser> {
        let module = resolver::shell_module(api_version)?;
        let commands = discover(module.command_modules)?;
        build_parser(&self.settings, &commands)
    }

    /// Top-level help, listing the commands of `api_version` when it is supported
    ///
    /// An unsupported version still gets the global options.
    fn print_top_level_help(&self, api_version: &str, out: &mut dyn Write) -> Result<()> {
        let text = match self.get_subcommand_parser(api_version) {
            Ok(parser) => HelpFormatter::new(PROG).format_help(parser.command()),
            Err(err) => {
                tracing::warn!(%err, "showing global options only");
                HelpFormatter::new(PROG).format_help(&base_parser(&self.settings))
            }
        };
        write!(out, "{text}")?;
        Ok(())
    }

    /// Print help for the named subcommand, or the top-level help
    fn do_help(&self, parser: &Parser, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
        let requested = args.try_get_one::<String>("command").ok().flatten();
        let text = match requested {
            Some(name) => {
                let subcommand = parser
                    .subcommands()
                    .get(name)
                    .ok_or_else(|| ShellError::CommandLookup { name: name.clone() })?;
                HelpFormatter::new(format!("{PROG} {name}")).format_help(&subcommand.command)
            }
            None => HelpFormatter::new(PROG).format_help(parser.command()),
        };
        write!(out, "{text}")?;
        Ok(())
    }
}

/// The subcommand a later `-h`/`--help` asks about, from the deferred tokens
fn help_request(deferred: &[String]) -> Option<&str> {
    let mut tokens = deferred.iter().take_while(|t| *t != "--");
    let name = tokens.find(|t| !t.starts_with('-'))?;
    tokens
        .any(|t| t == "-h" || t == "--help")
        .then_some(name.as_str())
}
