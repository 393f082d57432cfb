//! Global options
//!
//! Global options are recognised before and independently of subcommand
//! selection. The shell parses them twice: once on their own, from the
//! tokens [`split_known_args`] picks out, to learn the API version and log
//! level, and once more as part of the full parser.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::core::config::{Settings, MAX_TIMEOUT};

/// Program name used in usage lines and as argv[0] for clap
pub const PROG: &str = "rallyclient";

/// Values of the global options after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalOpts {
    pub help: bool,
    pub debug: bool,
    pub verbose: bool,
    pub timeout: u64,
    pub rally_url: Option<String>,
    pub api_version: String,
}

impl GlobalOpts {
    /// Read the global options from parsed matches
    ///
    /// `settings` backs values clap has no default for: the debug flag is
    /// on if either the command line or the settings turn it on.
    pub fn from_matches(matches: &ArgMatches, settings: &Settings) -> Self {
        let string = |id: &str| matches.try_get_one::<String>(id).ok().flatten().cloned();

        Self {
            help: matches.try_get_one::<bool>("help").ok().flatten().copied().unwrap_or(false),
            debug: matches.get_flag("debug") || settings.debug,
            verbose: matches.get_flag("verbose"),
            timeout: matches
                .get_one::<u64>("timeout")
                .copied()
                .unwrap_or(settings.timeout),
            rally_url: string("rally_url").or_else(|| settings.rally_url.clone()),
            api_version: string("rally_api_version").unwrap_or_else(|| settings.api_version.clone()),
        }
    }
}

/// Definitions of the global options, with defaults taken from `settings`
///
/// `--help` and `--version` only make sense before the subcommand; the rest
/// are global and may appear anywhere.
pub fn global_args(settings: &Settings) -> Vec<Arg> {
    let mut rally_url = Arg::new("rally_url")
        .long("rally-url")
        .alias("rally_url")
        .value_name("RALLY_URL")
        .help("Defaults to env[RALLY_URL].")
        .global(true);
    if let Some(url) = &settings.rally_url {
        rally_url = rally_url.default_value(url.clone());
    }

    vec![
        Arg::new("help")
            .short('h')
            .long("help")
            .action(ArgAction::SetTrue)
            .hide(true),
        Arg::new("version")
            .long("version")
            .action(ArgAction::Version)
            .help("Show program's version number and exit."),
        Arg::new("debug")
            .short('d')
            .long("debug")
            .action(ArgAction::SetTrue)
            .help("Defaults to env[RALLYCLIENT_DEBUG].")
            .global(true),
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::SetTrue)
            .help("Print more verbose output.")
            .global(true),
        Arg::new("timeout")
            .long("timeout")
            .value_name("TIMEOUT")
            .value_parser(value_parser!(u64).range(1..=MAX_TIMEOUT))
            .default_value(settings.timeout.to_string())
            .help("Number of seconds to wait for a response.")
            .global(true),
        rally_url,
        Arg::new("rally_api_version")
            .long("rally-api-version")
            .alias("rally_api_version")
            .value_name("RALLY_API_VERSION")
            .default_value(settings.api_version.clone())
            .help("Defaults to env[RALLY_API_VERSION] or 1.")
            .global(true),
    ]
}

/// A recognised option token
struct KnownToken<'a> {
    arg: &'a Arg,
    /// The value is part of the token (`--timeout=5`, `-t5`)
    inline_value: bool,
}

fn find_long<'a>(cmd: &'a Command, token: &str) -> Option<KnownToken<'a>> {
    let body = token.strip_prefix("--")?;
    let (name, inline_value) = match body.split_once('=') {
        Some((name, _)) => (name, true),
        None => (body, false),
    };

    cmd.get_arguments()
        .find(|arg| {
            arg.get_long() == Some(name)
                || arg
                    .get_all_aliases()
                    .is_some_and(|aliases| aliases.contains(&name))
        })
        .map(|arg| KnownToken { arg, inline_value })
}

fn find_short<'a>(cmd: &'a Command, token: &str) -> Option<KnownToken<'a>> {
    let body = token.strip_prefix('-').filter(|b| !b.is_empty() && !b.starts_with('-'))?;
    let by_short = |c: char| cmd.get_arguments().find(|arg| arg.get_short() == Some(c));

    let mut chars = body.chars();
    let first = by_short(chars.next()?)?;
    let rest = chars.as_str();

    if first.get_action().takes_values() {
        return Some(KnownToken {
            arg: first,
            inline_value: !rest.is_empty(),
        });
    }

    // A cluster of switches (`-dv`) is known only if every letter is
    let all_switches = rest
        .chars()
        .all(|c| by_short(c).is_some_and(|arg| !arg.get_action().takes_values()));
    all_switches.then_some(KnownToken {
        arg: first,
        inline_value: false,
    })
}

/// Split `argv` into tokens recognised by `cmd` and tokens deferred to the
/// subcommand parser
///
/// Global options are picked up anywhere; non-global ones only before the
/// first bare word. Everything from `--` on is deferred.
pub fn split_known_args(cmd: &Command, argv: &[String]) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut deferred = Vec::new();
    let mut seen_bare_word = false;
    let mut tokens = argv.iter();

    while let Some(token) = tokens.next() {
        if token == "--" {
            deferred.push(token.clone());
            deferred.extend(tokens.by_ref().cloned());
            break;
        }

        let found = if token.starts_with("--") {
            find_long(cmd, token)
        } else {
            find_short(cmd, token)
        };

        match found {
            Some(found) if found.arg.is_global_set() || !seen_bare_word => {
                known.push(token.clone());
                if found.arg.get_action().takes_values() && !found.inline_value {
                    if let Some(value) = tokens.next() {
                        known.push(value.clone());
                    }
                }
            }
            _ => {
                if !token.starts_with('-') {
                    seen_bare_word = true;
                }
                deferred.push(token.clone());
            }
        }
    }

    (known, deferred)
}
