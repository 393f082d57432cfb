//! YAML loading for deployment configs

pub mod diagnostics;

pub use diagnostics::ConfigSyntaxError;

use serde_json::Value;

/// Parse a deployment config document into a JSON value
///
/// The document must be a YAML mapping; anything else is reported at the
/// start of the file.
pub fn parse_deployment_config(source: &str, filename: &str) -> Result<Value, ConfigSyntaxError> {
    let value: Value = serde_yml::from_str(source)
        .map_err(|e| ConfigSyntaxError::from_serde_error(&e, source, filename))?;

    if !value.is_object() {
        return Err(ConfigSyntaxError::at(
            "expected a mapping at the top level",
            source,
            filename,
            1,
            1,
            Some("A deployment config starts with keys such as `type:` and `endpoint:`".to_string()),
        ));
    }

    Ok(value)
}
