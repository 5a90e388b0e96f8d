//! Application service — workspace start use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! Phases run strictly in order:
//! `Converting → Registering → StartingContainers → LaunchingAgents`, ending
//! in `Running`, `Degraded` or `Failed`.

use std::collections::HashMap;

use futures_util::future::join_all;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use workbay_common::{AgentDescriptor, DeclaredEnvironment, ServerConfig, agent_ids};

use crate::application::ports::{ContainerEngine, HttpProbe, ProgressReporter};
use crate::application::registry::MachineRegistry;
use crate::application::services::agent_launch::{AgentLauncher, LaunchContext, LaunchSettings};
use crate::application::services::workspace_stop::release;
use crate::domain::agent::AgentLaunchAttempt;
use crate::domain::environment::servers::servers_from_labels;
use crate::domain::environment::{self, PreparedEnvironment, ServerEnvVarProvider};
use crate::domain::error::{LaunchError, StartError, ValidationError};
use crate::domain::machine::{Instance, MachineState, RuntimeIdentity};

/// Orchestration phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Converting,
    Registering,
    StartingContainers,
    LaunchingAgents,
    Running,
    Degraded,
    Failed,
}

/// Inputs of one workspace start.
pub struct StartRequest<'a> {
    pub declared: &'a DeclaredEnvironment,
    pub identity: RuntimeIdentity,
    /// Effective agent descriptors, looked up by id.
    pub agents: &'a [AgentDescriptor],
    pub providers: &'a [Box<dyn ServerEnvVarProvider>],
    pub settings: &'a LaunchSettings,
}

/// Machines and agents of a started workspace.
#[derive(Debug)]
pub struct StartedWorkspace {
    pub workspace_id: String,
    /// Live machines in start order.
    pub machines: Vec<Instance>,
    pub agents: Vec<AgentLaunchAttempt>,
}

#[derive(Debug)]
pub enum StartOutcome {
    /// Every agent is live.
    Running(StartedWorkspace),
    /// Some non-essential agents failed; the workspace is usable.
    Degraded {
        workspace: StartedWorkspace,
        failures: Vec<LaunchError>,
    },
}

impl StartOutcome {
    #[must_use]
    pub fn workspace(&self) -> &StartedWorkspace {
        match self {
            StartOutcome::Running(workspace) | StartOutcome::Degraded { workspace, .. } => workspace,
        }
    }
}

/// Machine plus the agents to launch on it, in declared order.
struct LaunchPlan<'a> {
    instance: Instance,
    servers: IndexMap<String, ServerConfig>,
    agents: Vec<&'a AgentDescriptor>,
}

/// Start a workspace: prepare the environment, start every machine in
/// dependency order, then launch agents on all machines concurrently.
///
/// Any failure after containers were started rolls them back.
///
/// # Errors
///
/// `Validation` for bad declarations, `Engine` when a container fails to
/// start, `Agent` when the workspace agent (or every agent) fails,
/// `Cancelled` when `cancel` fires.
pub async fn start_workspace<E, H, R>(
    engine: &E,
    http: &H,
    registry: &MachineRegistry,
    reporter: &R,
    cancel: &CancellationToken,
    req: StartRequest<'_>,
) -> Result<StartOutcome, StartError>
where
    E: ContainerEngine,
    H: HttpProbe,
    R: ProgressReporter,
{
    let workspace_id = req.identity.workspace_id.clone();

    enter(StartPhase::Converting, &workspace_id);
    reporter.step("preparing environment...");
    let prepared = environment::prepare(req.declared, &req.identity, req.providers)?;
    let agents_by_machine = resolve_agents(req.declared, req.agents, engine.machine_type())?;

    enter(StartPhase::Registering, &workspace_id);
    let states = register(registry, &req.identity, &prepared)?;

    enter(StartPhase::StartingContainers, &workspace_id);
    let machines = start_containers(engine, registry, reporter, cancel, &prepared, &states)
        .await
        .inspect_err(|_| enter(StartPhase::Failed, &workspace_id))?;

    enter(StartPhase::LaunchingAgents, &workspace_id);
    let plans: Vec<LaunchPlan<'_>> = machines
        .iter()
        .filter_map(|instance| {
            let agents = agents_by_machine.get(&instance.state.name)?;
            if agents.is_empty() {
                return None;
            }
            let labels = &prepared.model.get(&instance.state.name)?.labels;
            Some(LaunchPlan {
                instance: instance.clone(),
                servers: servers_from_labels(labels),
                agents: agents.clone(),
            })
        })
        .collect();

    if !plans.is_empty() {
        reporter.step("starting agents...");
    }
    let ctx = LaunchContext {
        engine,
        http,
        settings: req.settings,
        cancel,
    };
    let results: Vec<Result<AgentLaunchAttempt, LaunchError>> =
        join_all(plans.iter().map(|plan| launch_machine_agents(&ctx, plan)))
            .await
            .into_iter()
            .flatten()
            .collect();

    let (launched, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let launched: Vec<AgentLaunchAttempt> = launched.into_iter().filter_map(Result::ok).collect();
    let mut failures: Vec<LaunchError> = failures.into_iter().filter_map(Result::err).collect();

    let started_ids: Vec<String> = machines.iter().map(|m| m.id().to_owned()).collect();
    if cancel.is_cancelled() {
        enter(StartPhase::Failed, &workspace_id);
        release(engine, registry, &started_ids).await;
        return Err(StartError::Cancelled);
    }

    let fatal = failures
        .iter()
        .position(|f| f.agent() == agent_ids::WS_AGENT)
        .or_else(|| (launched.is_empty() && !failures.is_empty()).then_some(0));
    if let Some(index) = fatal {
        enter(StartPhase::Failed, &workspace_id);
        let error = failures.swap_remove(index);
        tracing::error!(workspace = %workspace_id, error = %error, "essential agent failed, stopping workspace");
        release(engine, registry, &started_ids).await;
        return Err(StartError::Agent(error));
    }

    let workspace = StartedWorkspace {
        workspace_id: workspace_id.clone(),
        machines,
        agents: launched,
    };
    if failures.is_empty() {
        enter(StartPhase::Running, &workspace_id);
        reporter.success("workspace running");
        Ok(StartOutcome::Running(workspace))
    } else {
        enter(StartPhase::Degraded, &workspace_id);
        for failure in &failures {
            reporter.warn(&failure.to_string());
        }
        Ok(StartOutcome::Degraded {
            workspace,
            failures,
        })
    }
}

fn enter(phase: StartPhase, workspace_id: &str) {
    tracing::debug!(workspace = workspace_id, ?phase, "workspace start phase");
}

/// Map each machine to the descriptors it requests, dropping agents whose
/// machine types exclude the engine.
fn resolve_agents<'a>(
    declared: &DeclaredEnvironment,
    descriptors: &'a [AgentDescriptor],
    machine_type: &str,
) -> Result<HashMap<String, Vec<&'a AgentDescriptor>>, ValidationError> {
    let mut by_machine = HashMap::new();
    for (machine, config) in &declared.machines {
        let mut agents = Vec::with_capacity(config.agents.len());
        for id in &config.agents {
            let descriptor = descriptors.iter().find(|d| &d.id == id).ok_or_else(|| {
                ValidationError::UnknownAgent {
                    machine: machine.clone(),
                    agent: id.clone(),
                }
            })?;
            if descriptor.supports(machine_type) {
                agents.push(descriptor);
            } else {
                tracing::info!(
                    agent = %id,
                    machine = %machine,
                    machine_type,
                    "agent does not support machine type, skipping"
                );
            }
        }
        by_machine.insert(machine.clone(), agents);
    }
    Ok(by_machine)
}

/// Register every machine as declared, in model order.
fn register(
    registry: &MachineRegistry,
    identity: &RuntimeIdentity,
    prepared: &PreparedEnvironment,
) -> Result<HashMap<String, MachineState>, StartError> {
    let mut states: HashMap<String, MachineState> = HashMap::with_capacity(prepared.model.len());
    for name in prepared.model.machine_names() {
        let is_dev = prepared.dev_machine.as_deref() == Some(name);
        let state = MachineState::declared(identity, name, is_dev);
        if let Err(e) = registry.add_declared(state.clone()) {
            for registered in states.values() {
                let _ = registry.remove(&registered.id);
            }
            return Err(e.into());
        }
        states.insert(name.to_owned(), state);
    }
    Ok(states)
}

/// Start containers in start order, promoting each. On failure every
/// machine of this start is released.
async fn start_containers<E: ContainerEngine, R: ProgressReporter>(
    engine: &E,
    registry: &MachineRegistry,
    reporter: &R,
    cancel: &CancellationToken,
    prepared: &PreparedEnvironment,
    states: &HashMap<String, MachineState>,
) -> Result<Vec<Instance>, StartError> {
    let all_ids: Vec<String> = prepared
        .start_order
        .iter()
        .filter_map(|name| states.get(name).map(|s| s.id.clone()))
        .collect();
    let mut machines = Vec::with_capacity(all_ids.len());

    for name in &prepared.start_order {
        if cancel.is_cancelled() {
            release(engine, registry, &all_ids).await;
            return Err(StartError::Cancelled);
        }
        let (Some(state), Some(config)) = (states.get(name), prepared.model.get(name)) else {
            continue;
        };

        reporter.step(&format!("starting machine '{name}'..."));
        let handle = match engine.start_container(state, config).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(machine = %name, error = %e, "failed to start container");
                release(engine, registry, &all_ids).await;
                return Err(StartError::Engine {
                    machine: name.clone(),
                    source: e.into(),
                });
            }
        };
        match registry.promote(&state.id, handle.clone()) {
            Ok(instance) => {
                tracing::info!(machine = %name, container = %handle.container_id, "machine started");
                machines.push(instance);
            }
            Err(e) => {
                if let Err(destroy) = engine.destroy_container(&handle).await {
                    tracing::warn!(machine = %name, error = %destroy, "failed to destroy container");
                }
                release(engine, registry, &all_ids).await;
                return Err(e.into());
            }
        }
        reporter.success(&format!("machine '{name}' started"));
    }
    Ok(machines)
}

/// Launch one machine's agents one after another.
async fn launch_machine_agents<E: ContainerEngine, H: HttpProbe>(
    ctx: &LaunchContext<'_, E, H>,
    plan: &LaunchPlan<'_>,
) -> Vec<Result<AgentLaunchAttempt, LaunchError>> {
    let mut results = Vec::with_capacity(plan.agents.len());
    for descriptor in &plan.agents {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let launcher = AgentLauncher::for_descriptor(descriptor);
        let result = launcher
            .launch(ctx, &plan.instance, &plan.servers, descriptor)
            .await;
        if let Err(e) = &result {
            tracing::warn!(agent = %descriptor.id, machine = %plan.instance.state.name, error = %e, "agent failed to start");
        }
        results.push(result);
    }
    results
}
