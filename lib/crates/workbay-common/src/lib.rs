//! Wire types shared by workbay components.
//!
//! Everything here is plain serde data: the declared environment a user
//! authors and the agent descriptors the platform injects into machines.
//! No validation beyond what deserialization itself enforces lives here.

pub mod agent;
pub mod environment;

pub use agent::{AgentDescriptor, LivenessSpec, agent_ids};
pub use environment::{
    BuildSpec, DeclaredEnvironment, MachineConfig, Recipe, ServerConfig, ServiceSpec,
};
