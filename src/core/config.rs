//! Settings with a layered hierarchy, loaded once at start-up

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Seconds to wait for an API response unless told otherwise
pub const DEFAULT_TIMEOUT: u64 = 600;

/// Longest accepted request timeout, one year in seconds
pub const MAX_TIMEOUT: u64 = 86_400 * 365;

/// API version used when neither the config file nor the environment names one
pub const DEFAULT_API_VERSION: &str = "1";

pub const ENV_DEBUG: &str = "RALLYCLIENT_DEBUG";
pub const ENV_URL: &str = "RALLY_URL";
pub const ENV_API_VERSION: &str = "RALLY_API_VERSION";

/// Snapshot of the process environment
///
/// Captured once so that defaults and handlers read a consistent view, and
/// so tests can supply their own variables without touching the process.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment (non-unicode entries are skipped)
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// A variable's value, treating an empty value as unset
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Keys accepted in the global config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    debug: Option<bool>,
    rally_url: Option<String>,
    rally_api_version: Option<String>,
    timeout: Option<u64>,
}

/// Defaults for the global command-line options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Default for `--debug`
    pub debug: bool,

    /// Default for `--rally-url`
    pub rally_url: Option<String>,

    /// Default for `--rally-api-version`
    pub api_version: String,

    /// Default for `--timeout`
    pub timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            rally_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Load settings from all sources, merging in priority order
    pub fn load(env: &Environment) -> Self {
        Self::load_from(Self::global_config_path().as_deref(), env)
    }

    /// Load settings using an explicit config file path
    pub fn load_from(config_path: Option<&Path>, env: &Environment) -> Self {
        // 1. Built-in defaults
        let mut settings = Settings::default();

        // 2. Global user config (~/.config/rallyclient/config.yaml)
        if let Some(path) = config_path {
            if path.exists() {
                if let Ok(contents) = std::fs::read_to_string(path) {
                    if let Ok(file) = serde_yml::from_str::<FileSettings>(&contents) {
                        settings.merge(file);
                    }
                }
            }
        }

        // 3. Environment variables
        settings.apply_env(env);

        settings
    }

    /// Path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rallyclient")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge(&mut self, file: FileSettings) {
        if let Some(debug) = file.debug {
            self.debug = debug;
        }
        if file.rally_url.is_some() {
            self.rally_url = file.rally_url;
        }
        if let Some(version) = file.rally_api_version {
            self.api_version = version;
        }
        if let Some(timeout) = file.timeout.filter(|t| (1..=MAX_TIMEOUT).contains(t)) {
            self.timeout = timeout;
        }
    }

    fn apply_env(&mut self, env: &Environment) {
        // Any non-empty value turns debugging on, including "0"
        if env.non_empty(ENV_DEBUG).is_some() {
            self.debug = true;
        }
        if let Some(url) = env.non_empty(ENV_URL) {
            self.rally_url = Some(url.to_string());
        }
        if let Some(version) = env.non_empty(ENV_API_VERSION) {
            self.api_version = version.to_string();
        }
    }
}
