//! Declared environment files through the full preparation pipeline.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use workbay_cli::domain::environment::servers::{SERVER_LABEL_PREFIX, servers_from_labels};
use workbay_cli::domain::environment::{ServerEnvVarProvider, env_vars, prepare};
use workbay_cli::domain::error::ValidationError;
use workbay_cli::domain::machine::RuntimeIdentity;
use workbay_common::DeclaredEnvironment;

fn identity() -> RuntimeIdentity {
    RuntimeIdentity {
        workspace_id: "ws-7".into(),
        env_name: "default".into(),
        owner: "dev".into(),
    }
}

fn parse(yaml: &str) -> DeclaredEnvironment {
    serde_yaml::from_str(yaml).expect("valid yaml")
}

#[test]
fn inline_dockerfile_gets_agent_servers() {
    let declared = parse(
        r#"
recipe:
  type: dockerfile
  content: "FROM ubuntu:24.04\nRUN apt-get update"
machines:
  dev:
    agents: [workbay.ws-agent, workbay.ssh]
"#,
    );
    let prepared = prepare(&declared, &identity(), &env_vars::default_providers(None)).unwrap();

    assert_eq!(prepared.start_order, ["dev"]);
    assert_eq!(prepared.dev_machine.as_deref(), Some("dev"));
    let dev = prepared.model.get("dev").unwrap();
    let build = dev.build.as_ref().expect("build context");
    assert!(build.dockerfile_content.as_deref().unwrap().starts_with("FROM ubuntu"));
    assert!(dev.ports.contains("4401/tcp"));
    assert!(dev.ports.contains("22/tcp"));
    assert_eq!(
        dev.labels.get(&format!("{SERVER_LABEL_PREFIX}22/tcp.ref")).map(String::as_str),
        Some("ssh")
    );

    let servers = servers_from_labels(&dev.labels);
    assert_eq!(servers["wsagent"].path.as_deref(), Some("/api"));
    assert_eq!(servers["ssh"].port, "22/tcp");
}

#[test]
fn declared_server_ref_overrides_agent_default() {
    let declared = parse(
        r#"
recipe: { type: image, image: "ghcr.io/acme/dev:1" }
machines:
  dev:
    agents: [workbay.ws-agent]
    servers:
      wsagent: { port: "9000", protocol: http, path: /healthz }
"#,
    );
    let prepared = prepare(&declared, &identity(), &[]).unwrap();
    let dev = prepared.model.get("dev").unwrap();

    assert!(dev.ports.contains("9000/tcp"));
    assert!(!dev.ports.contains("4401/tcp"));
    assert_eq!(
        servers_from_labels(&dev.labels)["wsagent"].path.as_deref(),
        Some("/healthz")
    );
}

#[test]
fn image_recipe_with_two_machines_names_both() {
    let declared = parse(
        r#"
recipe: { type: image, image: "alpine:3" }
machines:
  dev: {}
  db: {}
"#,
    );
    let err = prepare(&declared, &identity(), &[]).unwrap_err();
    assert!(matches!(err, ValidationError::MachineCount { count: 2, .. }));
    assert!(err.to_string().contains("dev, db"));
}

#[test]
fn two_dev_machines_are_rejected() {
    let declared = parse(
        r#"
recipe:
  type: compose
  services:
    a: { image: alpine }
    b: { image: alpine }
machines:
  a: { agents: [workbay.ws-agent] }
  b: { agents: [workbay.ws-agent] }
"#,
    );
    let err = prepare(&declared, &identity(), &[]).unwrap_err();
    assert!(matches!(err, ValidationError::DevMachine { .. }));
}

#[test]
fn dependency_cycle_is_reported() {
    let declared = parse(
        r#"
recipe:
  type: compose
  services:
    a: { image: alpine, depends_on: [b] }
    b: { image: alpine, links: ["a:alias"] }
"#,
    );
    let err = prepare(&declared, &identity(), &[]).unwrap_err();
    assert!(matches!(err, ValidationError::DependencyCycle(_)), "got {err:?}");
}

#[test]
fn illegal_memory_limit_is_rejected() {
    let declared = parse(
        r#"
recipe: { type: image, image: alpine }
machines:
  dev:
    attributes: { memoryLimitBytes: "lots" }
"#,
    );
    let err = prepare(&declared, &identity(), &[]).unwrap_err();
    assert!(matches!(err, ValidationError::IllegalAttribute { .. }));
}

struct Fixed(&'static str, &'static str);

impl ServerEnvVarProvider for Fixed {
    fn get(&self, _identity: &RuntimeIdentity) -> Option<(String, String)> {
        Some((self.0.to_owned(), self.1.to_owned()))
    }
}

#[test]
fn first_provider_wins_and_overrides_recipe_env() {
    let declared = parse(
        r#"
recipe:
  type: compose
  services:
    dev:
      image: alpine
      environment: { REGION: from-recipe, KEEP: yes-please }
"#,
    );
    let providers: Vec<Box<dyn ServerEnvVarProvider>> = vec![
        Box::new(Fixed("REGION", "eu-1")),
        Box::new(Fixed("REGION", "us-2")),
    ];
    let prepared = prepare(&declared, &identity(), &providers).unwrap();
    let env = &prepared.model.get("dev").unwrap().environment;

    assert_eq!(env.get("REGION").map(String::as_str), Some("eu-1"));
    assert_eq!(env.get("KEEP").map(String::as_str), Some("yes-please"));
}

#[test]
fn compose_port_and_server_on_same_port_publish_once() {
    let declared = parse(
        r#"
recipe:
  type: compose
  services:
    web:
      image: nginx
      ports: ["8080"]
    db:
      image: postgres
      expose: ["5432"]
machines:
  web:
    servers:
      http: { port: "8080", protocol: http }
"#,
    );
    let prepared = prepare(&declared, &identity(), &[]).unwrap();

    let web = prepared.model.get("web").unwrap();
    assert_eq!(web.ports.len(), 1);
    assert!(web.ports.contains("8080"));
    assert_eq!(servers_from_labels(&web.labels)["http"].port, "8080/tcp");

    let db = prepared.model.get("db").unwrap();
    assert_eq!(db.expose.iter().collect::<Vec<_>>(), ["5432"]);
}
