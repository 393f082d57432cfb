//! HTTP contract tests for the version 1 client
//!
//! The client is blocking, so every call runs under `spawn_blocking` while
//! the mock server lives on the test runtime.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rallyclient::client::{get_client, ClientConfig, ClientError, Deployment};
use rallyclient::ShellError;

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        endpoint: Some(server.uri()),
        timeout: Duration::from_secs(5),
    }
}

/// Run `f` against a fresh version 1 client in a blocking context
async fn with_client<T, F>(config: ClientConfig, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&dyn rallyclient::client::Client) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let client = get_client("1", &config).unwrap();
        f(client.as_ref())
    })
    .await
    .unwrap()
}

fn deployment_json(uuid: &str) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "name": "lab",
        "status": "deploy->finished",
        "created_at": "2014-05-01T10:00:00",
        "active": false,
        "config": {"type": "ExistingCloud"},
        "endpoints": [{"auth_url": "http://keystone:5000/v2.0"}],
        "services": [{"services": "nova", "type": "compute", "status": "Available"}]
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([deployment_json("d1"), deployment_json("d2")])))
        .expect(1)
        .mount(&server)
        .await;

    let deployments: Vec<Deployment> = with_client(config(&server), |c| c.deployments().list().unwrap()).await;
    let uuids: Vec<_> = deployments.iter().map(|d| d.uuid.as_str()).collect();
    assert_eq!(uuids, vec!["d1", "d2"]);
    assert_eq!(deployments[0].services.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_sends_name_and_config() {
    let server = MockServer::start().await;
    let config_body = json!({"type": "ExistingCloud", "endpoint": {"auth_url": "http://keystone:5000/v2.0"}});
    Mock::given(method("POST"))
        .and(path("/v1/deployments"))
        .and(body_json(json!({"name": "lab", "config": config_body.clone()})))
        .respond_with(ResponseTemplate::new(201).set_body_json(deployment_json("new")))
        .expect(1)
        .mount(&server)
        .await;

    let created = with_client(config(&server), move |c| {
        c.deployments().create(&config_body, "lab").unwrap()
    })
    .await;
    assert_eq!(created.uuid, "new");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_default_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/deployments/default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deployment_json("d1")))
        .expect(1)
        .mount(&server)
        .await;

    let deployment = with_client(config(&server), |c| c.deployments().get(None).unwrap()).await;
    assert_eq!(deployment.config["type"], "ExistingCloud");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lifecycle_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/deployments/d1/recreate"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/deployments/d1/use"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/deployments/d1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    with_client(config(&server), |c| {
        let api = c.deployments();
        api.recreate(Some("d1")).unwrap();
        api.use_deployment("d1").unwrap();
        api.destroy(Some("d1")).unwrap();
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_field_becomes_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/deployments/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Deployment missing not found"})))
        .mount(&server)
        .await;

    let err = with_client(config(&server), |c| c.deployments().destroy(Some("missing")).unwrap_err()).await;
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Deployment missing not found");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_raw_body_becomes_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/deployments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is locked\n"))
        .mount(&server)
        .await;

    let err = with_client(config(&server), |c| c.deployments().list().unwrap_err()).await;
    assert!(matches!(
        err,
        ClientError::Api { status: 500, ref message } if message == "database is locked"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unexpected_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = with_client(config(&server), |c| c.deployments().list().unwrap_err()).await;
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[test]
fn test_unreachable_server_is_transport_error() {
    let config = ClientConfig {
        endpoint: Some("http://127.0.0.1:9".to_string()),
        timeout: Duration::from_secs(2),
    };
    let client = get_client("1", &config).unwrap();
    let err = client.deployments().list().unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[test]
fn test_unknown_version_has_no_client() {
    let err = get_client("2", &ClientConfig::default()).err().unwrap();
    assert!(matches!(err, ShellError::Resolve(_)));
}
