//! `deployment-*` subcommands

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::Path;

use crate::cli::registry::{declare_argument, ArgOptions, ArgSpec, CommandSource, Invocation, Member};
use crate::cli::table::{deployment_rows, record_rows, render_table, DEPLOYMENT_HEADERS};
use crate::client::Deployment;
use crate::core::config::Environment;
use crate::error::{Result, ShellError};
use crate::yaml::parse_deployment_config;

/// Variables `--fromenv` cannot do without
const REQUIRED_ENV: [&str; 4] = ["OS_USERNAME", "OS_PASSWORD", "OS_AUTH_URL", "OS_TENANT_NAME"];

const ENDPOINT_HEADERS: &[&str] = &[
    "auth_url",
    "username",
    "password",
    "tenant_name",
    "region_name",
    "use_public_urls",
    "admin_port",
];

const SERVICE_HEADERS: &[&str] = &["services", "type", "status"];

/// Deployment management commands
pub struct DeploymentShell;

fn uuid_arg() -> ArgSpec {
    declare_argument(
        ["--uuid"],
        ArgOptions::new().dest("deploy_id").help("UUID of a deployment."),
    )
}

impl CommandSource for DeploymentShell {
    fn name(&self) -> &'static str {
        "deployment"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::new(
                "do_deployment_create",
                "Create a new deployment on the basis of configuration file.\n\n\
                 The configuration is read from the YAML file given with\n\
                 --filename, or assembled from OS_* environment variables\n\
                 with --fromenv.",
                do_deployment_create,
            )
            .arg(declare_argument(
                ["--name"],
                ArgOptions::new().required(true).help("A name of the deployment."),
            ))
            .arg(declare_argument(
                ["--fromenv"],
                ArgOptions::new()
                    .store_true()
                    .help("Read environment variables instead of config file"),
            ))
            .arg(declare_argument(
                ["--filename"],
                ArgOptions::new().help("A path to the configuration file of the deployment."),
            ))
            .arg(declare_argument(
                ["--no-use"],
                ArgOptions::new()
                    .store_false()
                    .dest("do_use")
                    .help("Don't set new deployment as default for future operations"),
            )),
            Member::new(
                "do_deployment_recreate",
                "Destroy and create an existing deployment.",
                do_deployment_recreate,
            )
            .arg(uuid_arg()),
            Member::new(
                "do_deployment_destroy",
                "Delete the deployment.\n\n\
                 Destroys the deployment along with every resource created\n\
                 for it.",
                do_deployment_destroy,
            )
            .arg(uuid_arg()),
            Member::new("do_deployment_list", "List existing deployments.", do_deployment_list),
            Member::new(
                "do_deployment_config",
                "Display configuration of the deployment.",
                do_deployment_config,
            )
            .arg(uuid_arg())
            .arg(declare_argument(
                ["--json"],
                ArgOptions::new()
                    .store_true()
                    .dest("output_json")
                    .help("Output in json format(default)"),
            ))
            .arg(declare_argument(
                ["--pprint"],
                ArgOptions::new()
                    .store_true()
                    .dest("output_pprint")
                    .help("Output in pretty print format"),
            )),
            Member::new(
                "do_deployment_endpoint",
                "Display all endpoints of the deployment.",
                do_deployment_endpoint,
            )
            .arg(uuid_arg()),
            Member::new(
                "do_deployment_check",
                "Check keystone authentication and list all available services.",
                do_deployment_check,
            )
            .arg(uuid_arg()),
        ]
    }
}

/// Deployment config for an existing cloud described by `OS_*` variables
///
/// Fails with the names of the required variables that are unset.
pub fn config_from_env(env: &Environment) -> std::result::Result<Value, Vec<&'static str>> {
    let missing: Vec<&'static str> = REQUIRED_ENV
        .iter()
        .copied()
        .filter(|var| !env.contains(var))
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let var = |key: &str| env.get(key).unwrap_or_default();
    let mut endpoint = json!({
        "auth_url": var("OS_AUTH_URL"),
        "username": var("OS_USERNAME"),
        "password": var("OS_PASSWORD"),
        "tenant_name": var("OS_TENANT_NAME"),
    });
    if let Some(region) = env.get("OS_REGION_NAME").filter(|r| *r != "None") {
        endpoint["region_name"] = json!(region);
    }

    Ok(json!({ "type": "ExistingCloud", "endpoint": endpoint }))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path).map_err(|source| ShellError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_deployment_config(&source, &path.display().to_string())?)
}

fn print_deployments(out: &mut dyn Write, deployments: &[Deployment]) -> Result<()> {
    if deployments.is_empty() {
        writeln!(
            out,
            "There are no deployments. To create a new deployment, use:\n\
             rallyclient deployment-create"
        )?;
        return Ok(());
    }
    writeln!(out, "{}", render_table(DEPLOYMENT_HEADERS, &deployment_rows(deployments)))?;
    Ok(())
}

fn do_deployment_create(inv: &mut Invocation<'_>) -> Result<u8> {
    let name = inv.value("name").unwrap_or_default();

    let config = if inv.flag("fromenv") {
        match config_from_env(inv.env) {
            Ok(config) => config,
            Err(missing) => {
                writeln!(
                    inv.out,
                    "The following environment variables are required but not set: {}",
                    missing.join(" ")
                )?;
                return Ok(1);
            }
        }
    } else if let Some(filename) = inv.value("filename") {
        load_config_file(Path::new(filename))?
    } else {
        writeln!(inv.out, "Either --filename or --fromenv is required")?;
        return Ok(1);
    };

    let deployments = inv.client.deployments();
    let deployment = deployments.create(&config, name)?;
    tracing::info!(uuid = %deployment.uuid, name, "created deployment");
    print_deployments(inv.out, std::slice::from_ref(&deployment))?;

    if inv.flag("do_use") {
        deployments.use_deployment(&deployment.uuid)?;
    }
    Ok(0)
}

fn do_deployment_recreate(inv: &mut Invocation<'_>) -> Result<u8> {
    let id = inv.value("deploy_id");
    inv.client.deployments().recreate(id)?;
    tracing::info!(uuid = ?id, "recreated deployment");
    Ok(0)
}

fn do_deployment_destroy(inv: &mut Invocation<'_>) -> Result<u8> {
    let id = inv.value("deploy_id");
    inv.client.deployments().destroy(id)?;
    tracing::info!(uuid = ?id, "destroyed deployment");
    Ok(0)
}

fn do_deployment_list(inv: &mut Invocation<'_>) -> Result<u8> {
    let deployments = inv.client.deployments().list()?;
    print_deployments(inv.out, &deployments)?;
    Ok(0)
}

fn do_deployment_config(inv: &mut Invocation<'_>) -> Result<u8> {
    let pretty = inv.flag("output_pprint");
    if inv.flag("output_json") && pretty {
        writeln!(inv.out, "Please select only one output format")?;
        return Ok(1);
    }

    let config = inv.client.deployments().get(inv.value("deploy_id"))?.config;
    if pretty {
        let rendered = serde_json::to_string_pretty(&config).unwrap_or_else(|_| config.to_string());
        writeln!(inv.out)?;
        writeln!(inv.out, "{rendered}")?;
        writeln!(inv.out)?;
    } else {
        writeln!(inv.out, "{}", to_spaced_json(&config))?;
    }
    Ok(0)
}

/// Single-line JSON with a space after every `,` and `:`
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn to_spaced_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

fn do_deployment_endpoint(inv: &mut Invocation<'_>) -> Result<u8> {
    let deployment = inv.client.deployments().get(inv.value("deploy_id"))?;
    let rows = record_rows(&deployment.endpoints, ENDPOINT_HEADERS);
    writeln!(inv.out, "{}", render_table(ENDPOINT_HEADERS, &rows))?;
    Ok(0)
}

fn do_deployment_check(inv: &mut Invocation<'_>) -> Result<u8> {
    let deployment = inv.client.deployments().get(inv.value("deploy_id"))?;
    let rows = record_rows(&deployment.services, SERVICE_HEADERS);
    writeln!(inv.out, "{}", render_table(SERVICE_HEADERS, &rows))?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::discovery::discover;
    use crate::cli::parser::{build_parser, Binding};
    use crate::client::{Client, ClientError, DeploymentManager};
    use crate::core::config::Settings;
    use std::cell::RefCell;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct FakeApi {
        calls: RefCell<Vec<String>>,
        deployments: Vec<Deployment>,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        fn lookup(&self, id: Option<&str>) -> Deployment {
            self.deployments
                .iter()
                .find(|d| Some(d.uuid.as_str()) == id || (id.is_none() && d.active))
                .cloned()
                .unwrap_or_default()
        }
    }

    impl DeploymentManager for FakeApi {
        fn create(&self, config: &Value, name: &str) -> std::result::Result<Deployment, ClientError> {
            self.record(format!("create {name} {config}"));
            Ok(Deployment {
                uuid: "new-uuid".to_string(),
                name: name.to_string(),
                status: "deploy->init".to_string(),
                config: config.clone(),
                ..Deployment::default()
            })
        }

        fn list(&self) -> std::result::Result<Vec<Deployment>, ClientError> {
            self.record("list".to_string());
            Ok(self.deployments.clone())
        }

        fn get(&self, id: Option<&str>) -> std::result::Result<Deployment, ClientError> {
            self.record(format!("get {id:?}"));
            Ok(self.lookup(id))
        }

        fn destroy(&self, id: Option<&str>) -> std::result::Result<(), ClientError> {
            self.record(format!("destroy {id:?}"));
            Ok(())
        }

        fn recreate(&self, id: Option<&str>) -> std::result::Result<(), ClientError> {
            self.record(format!("recreate {id:?}"));
            Ok(())
        }

        fn use_deployment(&self, id: &str) -> std::result::Result<(), ClientError> {
            self.record(format!("use {id}"));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClient {
        api: FakeApi,
    }

    impl Client for FakeClient {
        fn deployments(&self) -> &dyn DeploymentManager {
            &self.api
        }
    }

    impl FakeClient {
        fn calls(&self) -> Vec<String> {
            self.api.calls.borrow().clone()
        }
    }

    fn sample_client() -> FakeClient {
        FakeClient {
            api: FakeApi {
                deployments: vec![Deployment {
                    uuid: "d1".to_string(),
                    name: "lab".to_string(),
                    status: "deploy->finished".to_string(),
                    created_at: Some("2014-05-01T10:00:00".to_string()),
                    active: true,
                    config: json!({"type": "ExistingCloud", "endpoint": {"auth_url": "http://keystone:5000/v2.0"}}),
                    endpoints: vec![json!({"auth_url": "http://keystone:5000/v2.0", "username": "admin"})],
                    services: vec![json!({"services": "nova", "type": "compute", "status": "Available"})],
                }],
                ..FakeApi::default()
            },
        }
    }

    fn run(client: &FakeClient, env: &Environment, tokens: &[&str]) -> (u8, String) {
        let commands = discover(&[&DeploymentShell]).unwrap();
        let parser = build_parser(&Settings::default(), &commands).unwrap();
        let argv: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let matches = parser.parse(&argv).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        let Binding::Handler(handler) = parser.subcommands().get(name).unwrap().binding else {
            panic!("{name} is not a handler");
        };

        let mut out = Vec::new();
        let code = {
            let mut inv = Invocation {
                client,
                args: sub,
                env,
                out: &mut out,
            };
            handler(&mut inv).unwrap()
        };
        (code, String::from_utf8(out).unwrap())
    }

    fn openstack_env(extra: &[(&str, &str)]) -> Environment {
        [
            ("OS_USERNAME", "admin"),
            ("OS_PASSWORD", "secret"),
            ("OS_AUTH_URL", "http://keystone:5000/v2.0"),
            ("OS_TENANT_NAME", "demo"),
        ]
        .iter()
        .chain(extra)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_discovers_all_commands() {
        let names: Vec<_> = discover(&[&DeploymentShell])
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "deployment-create",
                "deployment-recreate",
                "deployment-destroy",
                "deployment-list",
                "deployment-config",
                "deployment-endpoint",
                "deployment-check",
            ]
        );
    }

    #[test]
    fn test_config_from_env() {
        let config = config_from_env(&openstack_env(&[("OS_REGION_NAME", "RegionOne")])).unwrap();
        assert_eq!(config["type"], "ExistingCloud");
        assert_eq!(config["endpoint"]["username"], "admin");
        assert_eq!(config["endpoint"]["region_name"], "RegionOne");
    }

    #[test]
    fn test_config_from_env_skips_none_region() {
        let config = config_from_env(&openstack_env(&[("OS_REGION_NAME", "None")])).unwrap();
        assert!(config["endpoint"].get("region_name").is_none());
    }

    #[test]
    fn test_config_from_env_reports_missing() {
        let env: Environment = [("OS_USERNAME", "admin"), ("OS_AUTH_URL", "http://k")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(config_from_env(&env).unwrap_err(), vec!["OS_PASSWORD", "OS_TENANT_NAME"]);
    }

    #[test]
    fn test_create_fromenv_missing_variable() {
        let client = FakeClient::default();
        let env: Environment = [("OS_USERNAME", "admin"), ("OS_AUTH_URL", "http://k"), ("OS_TENANT_NAME", "t")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let (code, out) = run(&client, &env, &["deployment-create", "--name", "lab", "--fromenv"]);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            "The following environment variables are required but not set: OS_PASSWORD\n"
        );
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_create_fromenv_uses_new_deployment() {
        let client = FakeClient::default();
        let (code, out) = run(
            &client,
            &openstack_env(&[]),
            &["deployment-create", "--name", "lab", "--fromenv"],
        );

        assert_eq!(code, 0);
        assert!(out.contains("new-uuid"));
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("create lab "));
        assert!(calls[0].contains("ExistingCloud"));
        assert_eq!(calls[1], "use new-uuid");
    }

    #[test]
    fn test_create_no_use() {
        let client = FakeClient::default();
        let (code, _) = run(
            &client,
            &openstack_env(&[]),
            &["deployment-create", "--name", "lab", "--fromenv", "--no-use"],
        );
        assert_eq!(code, 0);
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn test_create_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "type: ExistingCloud\nendpoint:\n  auth_url: http://keystone:5000/v2.0").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let client = FakeClient::default();
        let (code, _) = run(
            &client,
            &Environment::default(),
            &["deployment-create", "--name", "lab", "--filename", &path],
        );
        assert_eq!(code, 0);
        assert!(client.calls()[0].contains("http://keystone:5000/v2.0"));
    }

    #[test]
    fn test_create_from_missing_file() {
        let client = FakeClient::default();
        let commands = discover(&[&DeploymentShell]).unwrap();
        let parser = build_parser(&Settings::default(), &commands).unwrap();
        let argv: Vec<String> = ["deployment-create", "--name", "lab", "--filename", "/nonexistent/rally.yaml"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let matches = parser.parse(&argv).unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        let env = Environment::default();
        let mut out = Vec::new();
        let mut inv = Invocation {
            client: &client,
            args: sub,
            env: &env,
            out: &mut out,
        };
        let err = do_deployment_create(&mut inv).unwrap_err();
        assert!(matches!(err, ShellError::Io { .. }));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_create_requires_a_source() {
        let client = FakeClient::default();
        let (code, out) = run(&client, &Environment::default(), &["deployment-create", "--name", "lab"]);
        assert_eq!(code, 1);
        assert_eq!(out, "Either --filename or --fromenv is required\n");
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_recreate_and_destroy() {
        let client = FakeClient::default();
        let env = Environment::default();
        run(&client, &env, &["deployment-recreate", "--uuid", "d1"]);
        run(&client, &env, &["deployment-destroy"]);
        assert_eq!(client.calls(), vec!["recreate Some(\"d1\")", "destroy None"]);
    }

    #[test]
    fn test_list_table() {
        let client = sample_client();
        let (code, out) = run(&client, &Environment::default(), &["deployment-list"]);
        assert_eq!(code, 0);
        for header in DEPLOYMENT_HEADERS {
            assert!(out.contains(header), "missing {header}");
        }
        assert!(out.contains("d1"));
        assert!(out.contains("2014-05-01 10:00:00"));
    }

    #[test]
    fn test_list_empty() {
        let client = FakeClient::default();
        let (code, out) = run(&client, &Environment::default(), &["deployment-list"]);
        assert_eq!(code, 0);
        assert!(out.starts_with("There are no deployments."));
    }

    #[test]
    fn test_config_both_formats() {
        let client = sample_client();
        let (code, out) = run(
            &client,
            &Environment::default(),
            &["deployment-config", "--json", "--pprint"],
        );
        assert_eq!(code, 1);
        assert_eq!(out, "Please select only one output format\n");
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_config_json() {
        let client = sample_client();
        let (code, out) = run(&client, &Environment::default(), &["deployment-config", "--uuid", "d1"]);
        assert_eq!(code, 0);
        let parsed: Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed["type"], "ExistingCloud");
        assert_eq!(out.lines().count(), 1);
        assert_eq!(client.calls(), vec!["get Some(\"d1\")"]);
    }

    #[test]
    fn test_config_default_spacing() {
        let client = sample_client();
        let (_, out) = run(&client, &Environment::default(), &["deployment-config"]);
        assert_eq!(
            out,
            "{\"endpoint\": {\"auth_url\": \"http://keystone:5000/v2.0\"}, \"type\": \"ExistingCloud\"}\n"
        );
    }

    #[test]
    fn test_spaced_json_arrays_and_empties() {
        let value = json!({"a": [1, "x", null], "b": {}, "c": []});
        assert_eq!(to_spaced_json(&value), r#"{"a": [1, "x", null], "b": {}, "c": []}"#);
    }

    #[test]
    fn test_config_pprint_framed_by_blank_lines() {
        let client = sample_client();
        let (_, out) = run(&client, &Environment::default(), &["deployment-config", "--pprint"]);
        assert!(out.starts_with("\n{"));
        assert!(out.ends_with("}\n\n"));
        assert_eq!(client.calls(), vec!["get None"]);
    }

    #[test]
    fn test_endpoint_and_check_tables() {
        let client = sample_client();
        let env = Environment::default();

        let (_, out) = run(&client, &env, &["deployment-endpoint", "--uuid", "d1"]);
        assert!(out.contains("use_public_urls"));
        assert!(out.contains("http://keystone:5000/v2.0"));

        let (_, out) = run(&client, &env, &["deployment-check"]);
        assert!(out.contains("compute"));
        assert!(out.contains("Available"));
    }
}
