//! Built-in agent kinds and their defaults.

use workbay_common::{LivenessSpec, ServerConfig, agent_ids};

/// Server ref the workspace agent answers on.
pub const WS_AGENT_SERVER: &str = "wsagent";
pub const TERMINAL_SERVER: &str = "terminal";
pub const SSH_SERVER: &str = "ssh";

pub const TERMINAL_PROCESS: &str = "workbay-terminal";
pub const SSH_PROCESS: &str = "sshd";

/// Launcher family, resolved from the descriptor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    WsAgent,
    Terminal,
    Ssh,
    Generic,
}

impl AgentKind {
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            agent_ids::WS_AGENT => AgentKind::WsAgent,
            agent_ids::TERMINAL => AgentKind::Terminal,
            agent_ids::SSH => AgentKind::Ssh,
            _ => AgentKind::Generic,
        }
    }

    /// Server the agent listens on, added to the machine unless the
    /// environment already declares that ref.
    #[must_use]
    pub fn default_server(self) -> Option<(&'static str, ServerConfig)> {
        let (reference, port, protocol, path) = match self {
            AgentKind::WsAgent => (WS_AGENT_SERVER, "4401/tcp", "http", Some("/api")),
            AgentKind::Terminal => (TERMINAL_SERVER, "4411/tcp", "ws", Some("/pty")),
            AgentKind::Ssh => (SSH_SERVER, "22/tcp", "ssh", None),
            AgentKind::Generic => return None,
        };
        Some((
            reference,
            ServerConfig {
                port: port.to_owned(),
                protocol: Some(protocol.to_owned()),
                path: path.map(str::to_owned),
                ..ServerConfig::default()
            },
        ))
    }

    /// Liveness used when the descriptor does not declare one. Empty means
    /// live as soon as the script is dispatched.
    #[must_use]
    pub fn default_liveness(self) -> Vec<LivenessSpec> {
        match self {
            AgentKind::WsAgent => vec![LivenessSpec::Http {
                server: WS_AGENT_SERVER.to_owned(),
                path: None,
            }],
            AgentKind::Terminal => vec![
                LivenessSpec::Process {
                    name: TERMINAL_PROCESS.to_owned(),
                },
                LivenessSpec::Port {
                    port: "4411/tcp".to_owned(),
                },
            ],
            AgentKind::Ssh => vec![
                LivenessSpec::Process {
                    name: SSH_PROCESS.to_owned(),
                },
                LivenessSpec::Port {
                    port: "22/tcp".to_owned(),
                },
            ],
            AgentKind::Generic => Vec::new(),
        }
    }
}
