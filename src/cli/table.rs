//! Table output for API records

use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

use crate::client::Deployment;

pub const DEPLOYMENT_HEADERS: &[&str] = &["UUID", "Created at", "Name", "Status", "Active"];

/// Render rows under the given headers as an ASCII table
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    builder.build().with(Style::ascii()).to_string()
}

/// Display form of a JSON value in a table cell
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows for arbitrary records, one column per field name
///
/// Fields missing from a record render as empty cells.
pub fn record_rows(records: &[Value], fields: &[&str]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| record.get(*field).map(format_cell).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Rows for deployments, oldest first
pub fn deployment_rows(deployments: &[Deployment]) -> Vec<Vec<String>> {
    let mut sorted: Vec<&Deployment> = deployments.iter().collect();
    sorted.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    sorted
        .into_iter()
        .map(|d| {
            vec![
                d.uuid.clone(),
                d.created_at_display(),
                d.name.clone(),
                d.status.clone(),
                if d.active { "*".to_string() } else { String::new() },
            ]
        })
        .collect()
}
