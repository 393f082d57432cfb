//! HTTP client for the version 1 API

use reqwest::blocking::{Client as HttpTransport, RequestBuilder, Response};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::{Client, ClientConfig, ClientError, Deployment, DeploymentManager};

const USER_AGENT: &str = concat!("rallyclient/", env!("CARGO_PKG_VERSION"));

/// Path segment the API resolves to the default deployment
const DEFAULT_DEPLOYMENT: &str = "default";

/// Factory registered for API version 1
pub fn connect(config: &ClientConfig) -> Result<Box<dyn Client>, ClientError> {
    Ok(Box::new(HttpClient::new(config)?))
}

/// Blocking HTTP client for the version 1 API
pub struct HttpClient {
    deployments: DeploymentApi,
}

impl HttpClient {
    /// Build a client; a missing endpoint only fails once a request is made
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = config.endpoint.as_deref().map(parse_endpoint).transpose()?;
        let http = HttpTransport::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            deployments: DeploymentApi { http, base },
        })
    }
}

impl Client for HttpClient {
    fn deployments(&self) -> &dyn DeploymentManager {
        &self.deployments
    }
}

fn parse_endpoint(url: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
    }
}

struct DeploymentApi {
    http: HttpTransport,
    base: Option<Url>,
}

impl DeploymentApi {
    /// Resolve path segments against the endpoint, keeping any base path
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let base = self.base.as_ref().ok_or(ClientError::EndpointNotConfigured)?;
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidEndpoint {
                url: base.to_string(),
                reason: "cannot be used as a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn deployment_url(&self, id: Option<&str>, action: Option<&str>) -> Result<Url, ClientError> {
        let mut segments = vec!["v1", "deployments", id.unwrap_or(DEFAULT_DEPLOYMENT)];
        segments.extend(action);
        self.url(&segments)
    }

    fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Response, ClientError> {
        tracing::info!(%method, %url, "sending request");

        let mut request: RequestBuilder = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "received response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
        })
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let response = self.send(method, url.clone(), body)?;
        response.json::<T>().map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// The `error` field of a JSON error body, else the trimmed body
fn error_message(body: &str) -> Option<String> {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
    from_json.or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
}

impl DeploymentManager for DeploymentApi {
    fn create(&self, config: &Value, name: &str) -> Result<Deployment, ClientError> {
        let body = json!({ "name": name, "config": config });
        self.fetch(Method::POST, self.url(&["v1", "deployments"])?, Some(&body))
    }

    fn list(&self) -> Result<Vec<Deployment>, ClientError> {
        self.fetch(Method::GET, self.url(&["v1", "deployments"])?, None)
    }

    fn get(&self, id: Option<&str>) -> Result<Deployment, ClientError> {
        self.fetch(Method::GET, self.deployment_url(id, None)?, None)
    }

    fn destroy(&self, id: Option<&str>) -> Result<(), ClientError> {
        self.send(Method::DELETE, self.deployment_url(id, None)?, None)?;
        Ok(())
    }

    fn recreate(&self, id: Option<&str>) -> Result<(), ClientError> {
        self.send(Method::POST, self.deployment_url(id, Some("recreate"))?, None)?;
        Ok(())
    }

    fn use_deployment(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::PUT, self.deployment_url(Some(id), Some("use"))?, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(endpoint: Option<&str>) -> DeploymentApi {
        DeploymentApi {
            http: HttpTransport::new(),
            base: endpoint.map(|e| parse_endpoint(e).unwrap()),
        }
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("http://127.0.0.1:8001").is_ok());
        assert!(parse_endpoint("https://rally.example.com/api/").is_ok());
        assert!(matches!(
            parse_endpoint("ftp://rally.example.com"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            parse_endpoint("rally"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_urls_keep_base_path() {
        let api = api(Some("http://rally.example.com/api/"));
        assert_eq!(
            api.url(&["v1", "deployments"]).unwrap().as_str(),
            "http://rally.example.com/api/v1/deployments"
        );
        assert_eq!(
            api.deployment_url(Some("abc"), Some("use")).unwrap().as_str(),
            "http://rally.example.com/api/v1/deployments/abc/use"
        );
    }

    #[test]
    fn test_default_deployment_url() {
        let api = api(Some("http://127.0.0.1:8001"));
        assert_eq!(
            api.deployment_url(None, None).unwrap().as_str(),
            "http://127.0.0.1:8001/v1/deployments/default"
        );
    }

    #[test]
    fn test_missing_endpoint_fails_per_request() {
        let api = api(None);
        assert!(matches!(api.list(), Err(ClientError::EndpointNotConfigured)));
        assert!(matches!(api.get(None), Err(ClientError::EndpointNotConfigured)));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"error": "not found"}"#).as_deref(), Some("not found"));
        assert_eq!(error_message("  boom \n").as_deref(), Some("boom"));
        assert_eq!(error_message(""), None);
    }
}
