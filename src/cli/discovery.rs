//! Command discovery over registered command sources

use std::collections::HashSet;

use crate::cli::registry::{ArgSpec, CommandSource, Handler};
use crate::error::{Result, ShellError};

/// Prefix marking a member as a subcommand handler
pub const HANDLER_PREFIX: &str = "do_";

/// A discovered subcommand
#[derive(Clone)]
pub struct CommandSpec {
    /// Hyphenated public name, e.g. `deployment-create`
    pub name: String,
    /// First non-blank line of the handler's documentation
    pub help: String,
    /// The full documentation
    pub description: String,
    pub arguments: Vec<ArgSpec>,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("arguments", &self.arguments.len())
            .finish()
    }
}

/// Public command name for a handler attribute, if it follows the convention
///
/// `do_deployment_create` becomes `deployment-create`.
pub fn command_name(attr: &str) -> Option<String> {
    attr.strip_prefix(HANDLER_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.replace('_', "-"))
}

/// First non-blank line of a doc string
pub fn summary_line(doc: &str) -> &str {
    doc.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// Trim a doc string and strip the indentation shared by its continuation lines
pub fn normalize_doc(doc: &str) -> String {
    let doc = doc.trim();
    let mut lines = doc.lines();
    let first = lines.next().unwrap_or("").to_string();
    let rest: Vec<&str> = lines.collect();

    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    std::iter::once(first)
        .chain(rest.iter().map(|l| l.get(indent..).unwrap_or("").trim_end().to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Discover the subcommands exposed by `sources`, in registration order
///
/// Members without the handler prefix are skipped. Two handlers deriving
/// the same name is a registration bug and fails the whole discovery.
pub fn discover(sources: &[&(dyn CommandSource + Sync)]) -> Result<Vec<CommandSpec>> {
    let mut seen = HashSet::new();
    let mut commands = Vec::new();

    for source in sources {
        for member in source.members() {
            let Some(name) = command_name(member.attr) else {
                tracing::debug!(module = source.name(), attr = member.attr, "skipping non-handler member");
                continue;
            };

            if !seen.insert(name.clone()) {
                return Err(ShellError::DuplicateCommand { name });
            }

            tracing::debug!(module = source.name(), command = %name, "discovered command");
            commands.push(CommandSpec {
                help: summary_line(member.doc).to_string(),
                description: normalize_doc(member.doc),
                name,
                arguments: member.arguments,
                handler: member.handler,
            });
        }
    }

    Ok(commands)
}
