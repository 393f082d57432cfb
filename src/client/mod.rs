//! Versioned API client contract
//!
//! The shell only needs the deployment operations; everything else about the
//! remote API lives behind [`Client`]. Concrete clients are looked up per API
//! version through the resolver, so handlers never name a version.

pub mod models;

pub use models::Deployment;

use miette::Diagnostic;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::DEFAULT_TIMEOUT;
use crate::core::resolver;
use crate::error::Result;

/// Connection parameters shared by every API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Rally API; requests fail until one is set
    pub endpoint: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

/// Errors raised by API clients
#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("Rally API endpoint is not set")]
    #[diagnostic(
        code(rallyclient::client::endpoint),
        help("Pass --rally-url or set env[RALLY_URL]")
    )]
    EndpointNotConfigured,

    #[error("Invalid Rally API endpoint '{url}': {reason}")]
    #[diagnostic(code(rallyclient::client::endpoint))]
    InvalidEndpoint { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(rallyclient::client::build))]
    Build(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    #[diagnostic(code(rallyclient::client::transport))]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rally API returned {status}: {message}")]
    #[diagnostic(code(rallyclient::client::api))]
    Api { status: u16, message: String },

    #[error("Unexpected response from {url}: {source}")]
    #[diagnostic(code(rallyclient::client::decode))]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Deployment operations of the remote API
///
/// `None` as an id addresses the API's default deployment, i.e. the one most
/// recently marked with [`DeploymentManager::use_deployment`].
pub trait DeploymentManager {
    fn create(&self, config: &Value, name: &str) -> Result<Deployment, ClientError>;

    fn list(&self) -> Result<Vec<Deployment>, ClientError>;

    fn get(&self, id: Option<&str>) -> Result<Deployment, ClientError>;

    fn destroy(&self, id: Option<&str>) -> Result<(), ClientError>;

    fn recreate(&self, id: Option<&str>) -> Result<(), ClientError>;

    /// Make a deployment the default for later operations
    fn use_deployment(&self, id: &str) -> Result<(), ClientError>;
}

/// A connected API client for one API version
pub trait Client {
    fn deployments(&self) -> &dyn DeploymentManager;
}

/// Constructor registered for an API version
pub type ClientFactory = fn(&ClientConfig) -> Result<Box<dyn Client>, ClientError>;

/// Build the client for `api_version`
pub fn get_client(api_version: &str, config: &ClientConfig) -> Result<Box<dyn Client>> {
    let factory = resolver::client_factory(api_version)?;
    tracing::debug!(api_version, endpoint = ?config.endpoint, "constructing API client");
    Ok(factory(config)?)
}
