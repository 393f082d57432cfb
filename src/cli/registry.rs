//! Argument declarations and command sources
//!
//! A command module exposes its handlers as [`Member`]s. Each member carries
//! the `do_*` attribute name it was registered under, its documentation, and
//! the ordered list of argument declarations built with
//! [`declare_argument`]. Nothing here touches a parser; discovery and the
//! parser builder read these declarations later.

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use std::io::Write;

use crate::client::Client;
use crate::core::config::Environment;
use crate::error::Result;

/// Type of a value-taking argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Str,
    Int,
}

/// What an argument does when it is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Store the following value
    #[default]
    Store,
    /// Flag that stores `true` (default `false`)
    StoreTrue,
    /// Flag that stores `false` (default `true`)
    StoreFalse,
}

/// Options of an argument declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgOptions {
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<String>,
    pub action: Action,
    pub dest: Option<String>,
    pub help: Option<String>,
    pub metavar: Option<String>,
    pub choices: Vec<String>,
}

impl ArgOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn store_true(self) -> Self {
        self.action(Action::StoreTrue)
    }

    pub fn store_false(self) -> Self {
        self.action(Action::StoreFalse)
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// One declared argument: its flag spellings and options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub flags: Vec<String>,
    pub options: ArgOptions,
}

/// Declare an argument
///
/// Flags starting with `-` declare an option (`"-u", "--uuid"`); a single
/// bare name declares a positional argument.
pub fn declare_argument<I, S>(flags: I, options: ArgOptions) -> ArgSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ArgSpec {
        flags: flags.into_iter().map(Into::into).collect(),
        options,
    }
}

impl ArgSpec {
    pub fn is_positional(&self) -> bool {
        self.flags.first().is_some_and(|f| !f.starts_with('-'))
    }

    /// Flag spellings, i.e. everything except a positional name
    pub fn option_strings(&self) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .map(String::as_str)
            .filter(|f| f.starts_with('-'))
    }

    /// Destination id of the parsed value
    ///
    /// Explicit `dest` wins; otherwise the first long flag without its dashes
    /// and with `-` turned into `_`, then the first short flag's letter.
    pub fn dest(&self) -> String {
        if let Some(dest) = &self.options.dest {
            return dest.clone();
        }
        if self.is_positional() {
            return self.flags[0].clone();
        }

        let long = self.option_strings().find_map(|f| f.strip_prefix("--"));
        let short = || self.option_strings().find_map(|f| f.strip_prefix('-'));
        long.or_else(short).unwrap_or_default().replace('-', "_")
    }

    fn metavar(&self) -> String {
        self.options
            .metavar
            .clone()
            .unwrap_or_else(|| self.dest().to_uppercase())
    }

    /// Translate the declaration into a clap argument
    pub fn to_arg(&self) -> Arg {
        let options = &self.options;
        let mut arg = Arg::new(self.dest());

        if self.is_positional() {
            arg = arg
                .value_name(options.metavar.clone().unwrap_or_else(|| self.flags[0].clone()))
                .required(options.required);
        } else {
            let mut longs = self.option_strings().filter_map(|f| f.strip_prefix("--"));
            if let Some(long) = longs.next() {
                arg = arg.long(long.to_string());
            }
            for alias in longs {
                arg = arg.alias(alias.to_string());
            }

            let mut shorts = self
                .option_strings()
                .filter(|f| !f.starts_with("--"))
                .filter_map(|f| f.chars().nth(1));
            if let Some(short) = shorts.next() {
                arg = arg.short(short);
            }
            for alias in shorts {
                arg = arg.short_alias(alias);
            }

            if options.required {
                arg = arg.required(true);
            }
        }

        arg = match options.action {
            Action::StoreTrue => arg.action(ArgAction::SetTrue),
            Action::StoreFalse => arg.action(ArgAction::SetFalse),
            Action::Store => {
                let arg = arg.action(ArgAction::Set);
                let arg = if self.is_positional() {
                    arg
                } else {
                    arg.value_name(self.metavar())
                };
                match options.value_type {
                    ValueType::Int => arg.value_parser(value_parser!(i64)),
                    ValueType::Str if !options.choices.is_empty() => {
                        arg.value_parser(PossibleValuesParser::new(options.choices.clone()))
                    }
                    ValueType::Str => arg.value_parser(value_parser!(String)),
                }
            }
        };

        if let Some(default) = &options.default {
            arg = arg.default_value(default.clone());
        }
        if let Some(help) = &options.help {
            arg = arg.help(help.clone());
        }

        arg
    }
}

/// Everything a handler gets to work with
pub struct Invocation<'a> {
    pub client: &'a dyn Client,
    /// Parsed values of the selected subcommand
    pub args: &'a ArgMatches,
    pub env: &'a Environment,
    pub out: &'a mut dyn Write,
}

impl<'a> Invocation<'a> {
    /// A string argument's value, if given or defaulted
    pub fn value(&self, id: &str) -> Option<&'a str> {
        let args: &'a ArgMatches = self.args;
        args.try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// A flag's value; undeclared flags read as `false`
    pub fn flag(&self, id: &str) -> bool {
        self.args
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }
}

/// A subcommand implementation; the returned value is the exit status
pub type Handler = fn(&mut Invocation<'_>) -> Result<u8>;

/// A handler registered under its `do_*` attribute name
#[derive(Clone)]
pub struct Member {
    pub attr: &'static str,
    pub doc: &'static str,
    pub arguments: Vec<ArgSpec>,
    pub handler: Handler,
}

impl Member {
    pub fn new(attr: &'static str, doc: &'static str, handler: Handler) -> Self {
        Self {
            attr,
            doc,
            arguments: Vec::new(),
            handler,
        }
    }

    /// Attach an argument declaration after those already attached
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.arguments.push(spec);
        self
    }
}

/// A module of command handlers
pub trait CommandSource {
    /// Module name, used in log output
    fn name(&self) -> &'static str;

    /// All members, in registration order
    fn members(&self) -> Vec<Member>;
}
