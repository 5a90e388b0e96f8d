//! Agent launch domain: kinds, liveness descriptions, attempt state machine.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.

pub mod kind;
pub mod launch;
pub mod liveness;

pub use kind::AgentKind;
pub use launch::{AgentLaunchAttempt, LaunchState};
pub use liveness::{CheckOutcome, LivenessCheck, Probe};
