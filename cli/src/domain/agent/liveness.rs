//! Liveness check descriptions. Evaluation lives in the application layer.

use std::fmt;

use indexmap::IndexMap;
use workbay_common::{LivenessSpec, ServerConfig};

use crate::domain::environment::servers::normalize_port;

/// One observable condition inside or in front of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// A process whose command line contains the name is running.
    ProcessRunning(String),
    /// The container port (`22/tcp`) accepts connections.
    PortListening(String),
    /// HTTP GET against the host address published for `port` answers
    /// 2xx/3xx.
    HttpPing { port: String, path: String },
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::ProcessRunning(name) => write!(f, "process '{name}' running"),
            Probe::PortListening(port) => write!(f, "port {port} listening"),
            Probe::HttpPing { port, path } => write!(f, "http ping {port}{path}"),
        }
    }
}

/// All probes must pass at the same poll. An empty check is always live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessCheck {
    pub probes: Vec<Probe>,
}

impl LivenessCheck {
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.probes.is_empty()
    }

    /// Combine probe results taken at one instant.
    #[must_use]
    pub fn outcome(&self, results: &[bool]) -> CheckOutcome {
        match self
            .probes
            .iter()
            .zip(results)
            .find(|(_, passed)| !**passed)
        {
            Some((probe, _)) => CheckOutcome::NotLive {
                failing: probe.to_string(),
            },
            None => CheckOutcome::Live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Live,
    /// `failing` describes the first probe that did not pass.
    NotLive { failing: String },
}

impl CheckOutcome {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, CheckOutcome::Live)
    }
}

/// Why a declared liveness condition cannot be turned into a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnknownServer(String),
    InvalidPort(String),
}

/// Build a check from declarative specs. HTTP specs resolve their server ref
/// against the machine's servers; a path on the `LivenessSpec` wins over the server path.
///
/// # Errors
///
/// `ResolveError` when a server ref is unknown or a port is malformed.
pub fn resolve(
    specs: &[LivenessSpec],
    servers: &IndexMap<String, ServerConfig>,
) -> Result<LivenessCheck, ResolveError> {
    let probes = specs
        .iter()
        .map(|spec| match spec {
            LivenessSpec::Process { name } => Ok(Probe::ProcessRunning(name.clone())),
            LivenessSpec::Port { port } => normalize_port(port)
                .map(Probe::PortListening)
                .ok_or_else(|| ResolveError::InvalidPort(port.clone())),
            LivenessSpec::Http { server, path } => {
                let config = servers
                    .get(server)
                    .ok_or_else(|| ResolveError::UnknownServer(server.clone()))?;
                let port = normalize_port(&config.port)
                    .ok_or_else(|| ResolveError::InvalidPort(config.port.clone()))?;
                let path = path
                    .as_ref()
                    .or(config.path.as_ref())
                    .map_or_else(|| "/".to_owned(), |p| with_leading_slash(p));
                Ok(Probe::HttpPing { port, path })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LivenessCheck { probes })
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}
