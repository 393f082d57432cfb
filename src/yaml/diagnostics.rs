//! Source-located diagnostics for deployment config files

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A deployment config file that could not be read as a YAML mapping
#[derive(Debug, Error, Diagnostic)]
#[error("Invalid deployment config: {message}")]
#[diagnostic(code(rallyclient::config::syntax))]
pub struct ConfigSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl ConfigSyntaxError {
    /// Build a diagnostic from a serde_yml error, pointing at its location
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));
        let message = err.to_string();
        let help = suggest_fix(&message);

        Self::at(message, source, filename, line, column, help)
    }

    /// Build a diagnostic at an explicit 1-based line/column
    pub fn at(
        message: impl Into<String>,
        source: &str,
        filename: &str,
        line: usize,
        column: usize,
        help: Option<String>,
    ) -> Self {
        let offset = offset_of(source, line, column);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Byte offset of a 1-based line/column, clamped to the end of the source
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();

    let rest = source.get(line_start..).unwrap_or("");
    let in_line = rest
        .char_indices()
        .take_while(|(_, c)| *c != '\n')
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or_else(|| rest.find('\n').unwrap_or(rest.len()));

    (line_start + in_line).min(source.len().saturating_sub(1))
}

fn suggest_fix(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("YAML indentation must use spaces, not tabs".to_string());
    }
    if msg.contains("duplicate") {
        return Some("Each key may appear only once per mapping".to_string());
    }
    if msg.contains("mapping values are not allowed") {
        return Some("Add a space after ':' or quote values that contain colons".to_string());
    }
    if msg.contains("block end") {
        return Some("Check that nested keys share the same indentation".to_string());
    }

    None
}
