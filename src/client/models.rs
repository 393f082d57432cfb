//! Records returned by the deployment API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A deployment as reported by the API
///
/// Only `uuid` is mandatory; the API omits fields it has no value for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub created_at: Option<String>,

    /// True for the deployment currently in use
    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub config: Value,

    #[serde(default)]
    pub endpoints: Vec<Value>,

    #[serde(default)]
    pub services: Vec<Value>,
}

impl Deployment {
    /// Creation time, accepting RFC 3339 or naive ISO timestamps (taken as UTC)
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    /// Creation time for display; unparseable values are shown verbatim
    pub fn created_at_display(&self) -> String {
        match self.created_at() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.created_at.clone().unwrap_or_default(),
        }
    }
}
