//! Help text rendering
//!
//! Renders usage and help for a clap command in a two-column layout:
//! invocations on the left, help text starting at a shared column on the
//! right. The column is as narrow as the longest invocation allows, up to
//! a maximum. Subcommand names and other choice sets may push that maximum
//! out so they are not pushed onto their own line, but never past
//! [`MAX_WIDTH_ARGUMENTS`].

use clap::{Arg, Command};

use crate::cli::helpers::wrap_text;

/// Default maximum column for help text
pub const DEFAULT_MAX_HELP_POSITION: usize = 24;

/// Room reserved around a choice when widening the column
pub const INDENT_BEFORE_ARGUMENTS: usize = 6;

/// Hard limit for the widened column
pub const MAX_WIDTH_ARGUMENTS: usize = 32;

const INDENT: usize = 2;
const CHOICE_INDENT: usize = 4;
const FALLBACK_WIDTH: usize = 80;

/// Capitalise the first character of a section heading
pub fn capitalize_heading(heading: &str) -> String {
    let mut chars = heading.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Widen `max_help_position` for a set of choices
///
/// Each choice needs `len + INDENT_BEFORE_ARGUMENTS` columns; the position
/// grows to fit it unless that would exceed [`MAX_WIDTH_ARGUMENTS`].
pub fn widen_for_choices<'a>(
    max_help_position: usize,
    choices: impl IntoIterator<Item = &'a str>,
) -> usize {
    choices.into_iter().fold(max_help_position, |position, choice| {
        let length = choice.chars().count() + INDENT_BEFORE_ARGUMENTS;
        if length > position && length <= MAX_WIDTH_ARGUMENTS {
            length
        } else {
            position
        }
    })
}

/// One line item in a section
struct Row {
    indent: usize,
    invocation: String,
    help: String,
}

struct Section {
    heading: &'static str,
    rows: Vec<Row>,
}

fn visible_subcommands(cmd: &Command) -> impl Iterator<Item = &Command> {
    cmd.get_subcommands().filter(|sub| !sub.is_hide_set())
}

fn arg_help(arg: &Arg) -> String {
    arg.get_help().map(|h| h.to_string()).unwrap_or_default()
}

fn value_name(arg: &Arg) -> String {
    arg.get_value_names()
        .and_then(|names| names.first())
        .map(|name| name.to_string())
        .unwrap_or_else(|| arg.get_id().as_str().to_uppercase())
}

fn takes_value(arg: &Arg) -> bool {
    arg.get_action().takes_values()
}

/// `-n NAME, --name NAME` style invocation of an option
fn option_invocation(arg: &Arg) -> String {
    let suffix = if takes_value(arg) {
        format!(" {}", value_name(arg))
    } else {
        String::new()
    };

    arg.get_short()
        .map(|c| format!("-{c}"))
        .into_iter()
        .chain(arg.get_long().map(|l| format!("--{l}")))
        .map(|flag| format!("{flag}{suffix}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `[-d]`, `--name NAME` or `[<subcommand>]` as shown in the usage line
fn usage_part(arg: &Arg) -> String {
    let part = if arg.is_positional() {
        value_name(arg)
    } else {
        let flag = arg
            .get_short()
            .map(|c| format!("-{c}"))
            .or_else(|| arg.get_long().map(|l| format!("--{l}")))
            .unwrap_or_default();
        if takes_value(arg) {
            format!("{flag} {}", value_name(arg))
        } else {
            flag
        }
    };

    if arg.is_required_set() {
        part
    } else {
        format!("[{part}]")
    }
}

/// Help renderer for one command
pub struct HelpFormatter {
    prog: String,
    width: usize,
}

impl HelpFormatter {
    /// Formatter for `prog`, sized to the terminal
    pub fn new(prog: impl Into<String>) -> Self {
        let columns = console::Term::stdout()
            .size_checked()
            .map(|(_, cols)| usize::from(cols))
            .unwrap_or(FALLBACK_WIDTH);
        Self::with_width(prog, columns)
    }

    /// Formatter for `prog` at a fixed terminal width
    pub fn with_width(prog: impl Into<String>, columns: usize) -> Self {
        Self {
            prog: prog.into(),
            width: columns.saturating_sub(2).max(INDENT * 10),
        }
    }

    fn usage(&self, cmd: &Command) -> String {
        let mut parts: Vec<String> = cmd
            .get_arguments()
            .filter(|arg| !arg.is_hide_set() && !arg.is_positional())
            .map(usage_part)
            .collect();
        parts.extend(
            cmd.get_positionals()
                .filter(|arg| !arg.is_hide_set())
                .map(usage_part),
        );
        if visible_subcommands(cmd).next().is_some() {
            let name = cmd.get_subcommand_value_name().unwrap_or("SUBCOMMAND");
            parts.push(format!("{name} ..."));
        }

        let lead = format!("usage: {} ", self.prog);
        let body_width = self.width.saturating_sub(lead.len()).max(20);
        let lines = wrap_text(&parts.join(" "), body_width);

        let mut usage = String::new();
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                usage.push_str(&lead);
            } else {
                usage.push_str(&" ".repeat(lead.len()));
            }
            usage.push_str(line);
            usage.push('\n');
        }
        usage
    }

    /// Sections and the maximum help position they call for
    fn sections(&self, cmd: &Command) -> (Vec<Section>, usize) {
        let mut max_help_position = DEFAULT_MAX_HELP_POSITION.min(self.width.saturating_sub(20).max(INDENT * 2));
        let mut positional = Vec::new();
        let mut optional = Vec::new();

        for arg in cmd.get_arguments().filter(|arg| !arg.is_hide_set()) {
            if arg.is_positional() {
                let choices = arg.get_possible_values();
                max_help_position =
                    widen_for_choices(max_help_position, choices.iter().map(|c| c.get_name()));
                positional.push(Row {
                    indent: INDENT,
                    invocation: value_name(arg),
                    help: arg_help(arg),
                });
            } else {
                optional.push(Row {
                    indent: INDENT,
                    invocation: option_invocation(arg),
                    help: arg_help(arg),
                });
            }
        }

        if visible_subcommands(cmd).next().is_some() {
            max_help_position =
                widen_for_choices(max_help_position, visible_subcommands(cmd).map(|s| s.get_name()));
            positional.push(Row {
                indent: INDENT,
                invocation: cmd.get_subcommand_value_name().unwrap_or("SUBCOMMAND").to_string(),
                help: String::new(),
            });
            positional.extend(visible_subcommands(cmd).map(|sub| Row {
                indent: CHOICE_INDENT,
                invocation: sub.get_name().to_string(),
                help: sub.get_about().map(|a| a.to_string()).unwrap_or_default(),
            }));
        }

        let sections = [
            Section {
                heading: "positional arguments",
                rows: positional,
            },
            Section {
                heading: "optional arguments",
                rows: optional,
            },
        ]
        .into_iter()
        .filter(|s| !s.rows.is_empty())
        .collect();

        (sections, max_help_position)
    }

    /// Column at which help text starts for these sections
    fn help_position(sections: &[Section], max_help_position: usize) -> usize {
        let longest = sections
            .iter()
            .flat_map(|s| &s.rows)
            .map(|row| row.indent + row.invocation.chars().count())
            .max()
            .unwrap_or(0);
        (longest + 2).min(max_help_position)
    }

    fn format_row(&self, row: &Row, help_position: usize, out: &mut String) {
        let pad = " ".repeat(row.indent);
        let invocation_width = help_position.saturating_sub(row.indent + 2);
        let help_width = self.width.saturating_sub(help_position).max(11);
        let help_lines = if row.help.is_empty() {
            Vec::new()
        } else {
            wrap_text(&row.help, help_width)
        };

        let mut help_lines = help_lines.into_iter();
        match help_lines.next() {
            None => {
                out.push_str(&format!("{pad}{}\n", row.invocation));
            }
            Some(first) if row.invocation.chars().count() <= invocation_width => {
                out.push_str(&format!(
                    "{pad}{:<invocation_width$}  {first}\n",
                    row.invocation
                ));
            }
            Some(first) => {
                out.push_str(&format!("{pad}{}\n", row.invocation));
                out.push_str(&format!("{}{first}\n", " ".repeat(help_position)));
            }
        }
        for line in help_lines {
            out.push_str(&format!("{}{line}\n", " ".repeat(help_position)));
        }
    }

    /// Render the full help text for `cmd`
    pub fn format_help(&self, cmd: &Command) -> String {
        let mut out = self.usage(cmd);

        let description = cmd
            .get_long_about()
            .or_else(|| cmd.get_about())
            .map(|d| d.to_string())
            .unwrap_or_default();
        if !description.trim().is_empty() {
            out.push('\n');
            for paragraph in description.trim().split("\n\n") {
                let joined = paragraph.lines().map(str::trim).collect::<Vec<_>>().join(" ");
                for line in wrap_text(&joined, self.width) {
                    out.push_str(&line);
                    out.push('\n');
                }
                out.push('\n');
            }
            out.pop();
        }

        let (sections, max_help_position) = self.sections(cmd);
        let help_position = Self::help_position(&sections, max_help_position);
        for section in &sections {
            out.push('\n');
            out.push_str(&capitalize_heading(section.heading));
            out.push_str(":\n");
            for row in &section.rows {
                self.format_row(row, help_position, &mut out);
            }
        }

        if let Some(epilog) = cmd.get_after_help() {
            out.push('\n');
            for line in wrap_text(&epilog.to_string(), self.width) {
                out.push_str(&line);
                out.push('\n');
            }
        }

        out
    }
}
