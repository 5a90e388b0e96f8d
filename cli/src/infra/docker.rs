//! Infrastructure implementation of the `ContainerEngine` port on top of the
//! `docker` CLI.
//!
//! All commands go through a `CommandRunner`, so tests script the CLI
//! instead of needing a daemon.

use std::process::Output;

use anyhow::{Context, Result, bail};

use crate::application::ports::{CommandRunner, ContainerEngine};
use crate::domain::environment::ContainerConfig;
use crate::domain::machine::{InstanceHandle, MachineState};

const DOCKER: &str = "docker";

/// Label keys identifying workbay-managed containers.
pub const WORKSPACE_LABEL: &str = "workbay.workspace";
pub const MACHINE_LABEL: &str = "workbay.machine";

pub struct DockerEngine<R> {
    runner: R,
    machine_type: String,
}

impl<R: CommandRunner> DockerEngine<R> {
    #[must_use]
    pub fn new(runner: R, machine_type: impl Into<String>) -> Self {
        Self {
            runner,
            machine_type: machine_type.into(),
        }
    }

    async fn docker(&self, args: &[&str]) -> Result<Output> {
        self.runner.run(DOCKER, args).await
    }

    /// Run docker and require success; returns trimmed stdout.
    async fn docker_ok(&self, args: &[&str]) -> Result<String> {
        let out = self.docker(args).await?;
        check(&out, args)?;
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    async fn ensure_network(&self, network: &str) -> Result<()> {
        let out = self.docker(&["network", "create", network]).await?;
        if out.status.success() || stderr(&out).contains("already exists") {
            return Ok(());
        }
        check(&out, &["network", "create", network])
    }

    /// Build the image for a machine with a build context; returns its tag.
    async fn build_image(&self, machine: &MachineState, config: &ContainerConfig) -> Result<String> {
        let tag = image_tag(machine);
        let Some(build) = &config.build else {
            bail!("machine '{}' has no build context", machine.name);
        };

        let mut args: Vec<String> = vec!["build".into(), "-t".into(), tag.clone()];
        for (key, value) in &build.args {
            args.push("--build-arg".into());
            args.push(format!("{key}={value}"));
        }

        let out = if let Some(content) = &build.dockerfile_content {
            args.push("-f".into());
            args.push("-".into());
            args.push(build.context.clone().unwrap_or_else(|| ".".into()));
            let argv: Vec<&str> = args.iter().map(String::as_str).collect();
            self.runner
                .run_with_stdin(DOCKER, &argv, content.as_bytes())
                .await?
        } else {
            if let Some(path) = &build.dockerfile_path {
                args.push("-f".into());
                args.push(path.clone());
            }
            let context = build
                .context
                .clone()
                .with_context(|| format!("machine '{}' has no build context", machine.name))?;
            args.push(context);
            let argv: Vec<&str> = args.iter().map(String::as_str).collect();
            self.docker(&argv).await?
        };
        check(&out, &["build", &tag])?;
        Ok(tag)
    }
}

impl<R: CommandRunner> ContainerEngine for DockerEngine<R> {
    fn machine_type(&self) -> &str {
        &self.machine_type
    }

    async fn start_container(
        &self,
        machine: &MachineState,
        config: &ContainerConfig,
    ) -> Result<InstanceHandle> {
        let image = match &config.image {
            Some(image) if !image.is_empty() => image.clone(),
            _ => self.build_image(machine, config).await?,
        };

        let network = network_name(&machine.workspace_id);
        self.ensure_network(&network).await?;

        let args = run_args(machine, config, &network, &image);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let container_id = self
            .docker_ok(&argv)
            .await
            .with_context(|| format!("starting container for machine '{}'", machine.name))?;

        Ok(InstanceHandle {
            container_id,
            machine_type: self.machine_type.clone(),
        })
    }

    async fn exec_detached(&self, handle: &InstanceHandle, script: &str) -> Result<()> {
        self.docker_ok(&["exec", "-d", &handle.container_id, "sh", "-c", script])
            .await
            .map(|_| ())
    }

    async fn is_process_running(&self, handle: &InstanceHandle, name: &str) -> Result<bool> {
        let out = self
            .docker(&["exec", &handle.container_id, "pgrep", "-f", name])
            .await?;
        Ok(out.status.success())
    }

    async fn is_port_listening(&self, handle: &InstanceHandle, port: &str) -> Result<bool> {
        let (number, proto) = split_port(port)?;
        let tables = if proto == "udp" {
            "cat /proc/net/udp /proc/net/udp6 2>/dev/null"
        } else {
            "cat /proc/net/tcp /proc/net/tcp6 2>/dev/null"
        };
        let out = self
            .docker(&["exec", &handle.container_id, "sh", "-c", tables])
            .await?;
        Ok(listening_in_proc_net(
            &String::from_utf8_lossy(&out.stdout),
            number,
            proto == "udp",
        ))
    }

    async fn host_address(&self, handle: &InstanceHandle, port: &str) -> Result<Option<String>> {
        let out = self.docker(&["port", &handle.container_id, port]).await?;
        if !out.status.success() {
            return Ok(None);
        }
        Ok(parse_host_address(&String::from_utf8_lossy(&out.stdout)))
    }

    async fn is_alive(&self, handle: &InstanceHandle) -> Result<bool> {
        let args = ["inspect", "-f", "{{.State.Running}}", handle.container_id.as_str()];
        let out = self.docker(&args).await?;
        if !out.status.success() {
            if stderr(&out).contains("No such") {
                return Ok(false);
            }
            check(&out, &args)?;
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim() == "true")
    }

    async fn destroy_container(&self, handle: &InstanceHandle) -> Result<()> {
        let args = ["rm", "-f", handle.container_id.as_str()];
        let out = self.docker(&args).await?;
        if out.status.success() || stderr(&out).contains("No such container") {
            return Ok(());
        }
        check(&out, &args)
    }
}

/// `workbay-<workspace>-<machine>`.
#[must_use]
pub fn container_name(workspace_id: &str, machine: &str) -> String {
    format!("workbay-{workspace_id}-{machine}")
}

fn network_name(workspace_id: &str) -> String {
    format!("workbay-{workspace_id}")
}

fn image_tag(machine: &MachineState) -> String {
    format!(
        "workbay/{}-{}:latest",
        machine.workspace_id.to_ascii_lowercase(),
        machine.name.to_ascii_lowercase()
    )
}

/// Arguments of `docker run` for one machine.
fn run_args(
    machine: &MachineState,
    config: &ContainerConfig,
    network: &str,
    image: &str,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "run".into(),
        "-d".into(),
        "--name".into(),
        container_name(&machine.workspace_id, &machine.name),
        "--hostname".into(),
        machine.name.clone(),
        "--network".into(),
        network.to_string(),
        "--network-alias".into(),
        machine.name.clone(),
        "--label".into(),
        format!("{WORKSPACE_LABEL}={}", machine.workspace_id),
        "--label".into(),
        format!("{MACHINE_LABEL}={}", machine.name),
    ];
    for (key, value) in &config.labels {
        args.push("--label".into());
        args.push(format!("{key}={value}"));
    }
    for (key, value) in &config.environment {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    for port in &config.expose {
        args.push("--expose".into());
        args.push(port.clone());
    }
    // Container-only port: docker picks the host port.
    for port in &config.ports {
        args.push("-p".into());
        args.push(port.clone());
    }
    for volume in &config.volumes {
        args.push("-v".into());
        args.push(volume.clone());
    }
    for source in &config.volumes_from {
        args.push("--volumes-from".into());
        args.push(container_name(&machine.workspace_id, source));
    }
    if let Some(limit) = config.mem_limit {
        args.push("--memory".into());
        args.push(limit.to_string());
    }

    let mut command = config.command.clone();
    if let Some((entry, rest)) = config.entrypoint.split_first() {
        args.push("--entrypoint".into());
        args.push(entry.clone());
        command.splice(0..0, rest.iter().cloned());
    }
    args.push(image.to_string());
    args.extend(command);
    args
}

fn split_port(port: &str) -> Result<(u16, &str)> {
    let (number, proto) = port.split_once('/').unwrap_or((port, "tcp"));
    let number = number
        .parse()
        .with_context(|| format!("invalid port '{port}'"))?;
    Ok((number, proto))
}

/// Whether a `/proc/net/{tcp,udp}` dump shows a socket bound to `port`.
/// TCP sockets must be in LISTEN state (`0A`); UDP sockets are unconnected
/// (`07`).
fn listening_in_proc_net(table: &str, port: u16, udp: bool) -> bool {
    let wanted_state = if udp { "07" } else { "0A" };
    table.lines().skip_while(|l| l.trim_start().starts_with("sl")).any(|line| {
        let mut cols = line.split_whitespace();
        let local = cols.nth(1);
        let state = cols.nth(1);
        match (local, state) {
            (Some(local), Some(state)) => {
                state == wanted_state
                    && local
                        .rsplit_once(':')
                        .and_then(|(_, hex)| u16::from_str_radix(hex, 16).ok())
                        == Some(port)
            }
            _ => false,
        }
    })
}

/// First mapping of `docker port` output, with wildcard hosts made local.
fn parse_host_address(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (host, port) = line.rsplit_once(':')?;
    let host = match host {
        "0.0.0.0" | "[::]" | "::" => "127.0.0.1",
        other => other,
    };
    Some(format!("{host}:{port}"))
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

fn check(out: &Output, args: &[&str]) -> Result<()> {
    if out.status.success() {
        return Ok(());
    }
    bail!(
        "docker {} failed: {}",
        args.first().copied().unwrap_or_default(),
        stderr(out).trim()
    )
}
