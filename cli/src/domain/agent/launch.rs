//! Per-attempt launch state machine.

use std::time::Duration;

use serde::Serialize;
use workbay_common::AgentDescriptor;

use super::liveness::CheckOutcome;

/// `NotStarted → ScriptRunning → Polling → {Live | TimedOut | Failed}`.
///
/// `Failed` is also reachable from `NotStarted` and `ScriptRunning` when the
/// engine rejects the script or the attempt is cancelled before polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchState {
    NotStarted,
    ScriptRunning,
    Polling,
    Live,
    TimedOut,
    Failed,
}

impl LaunchState {
    #[must_use]
    pub fn can_transition_to(self, next: LaunchState) -> bool {
        use LaunchState::{Failed, Live, NotStarted, Polling, ScriptRunning, TimedOut};
        matches!(
            (self, next),
            (NotStarted, ScriptRunning | Failed)
                | (ScriptRunning, Polling | Failed)
                | (Polling, Live | TimedOut | Failed)
        )
    }
}

/// Bookkeeping of one agent launch on one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLaunchAttempt {
    pub agent: String,
    pub machine: String,
    pub max_wait: Duration,
    pub poll_interval: Duration,
    pub polls: u32,
    pub elapsed: Duration,
    pub last_check: Option<CheckOutcome>,
    state: LaunchState,
}

impl AgentLaunchAttempt {
    #[must_use]
    pub fn new(descriptor: &AgentDescriptor, machine: &str) -> Self {
        Self {
            agent: descriptor.id.clone(),
            machine: machine.to_owned(),
            max_wait: Duration::from_millis(descriptor.max_start_time_ms),
            poll_interval: Duration::from_millis(descriptor.poll_interval_ms),
            polls: 0,
            elapsed: Duration::ZERO,
            last_check: None,
            state: LaunchState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// Move to `next`. Illegal transitions leave the state unchanged and
    /// return `false`.
    pub fn advance(&mut self, next: LaunchState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    pub fn record_check(&mut self, outcome: CheckOutcome, elapsed: Duration) {
        self.polls += 1;
        self.elapsed = elapsed;
        self.last_check = Some(outcome);
    }

    /// Whether the next poll would start at or past the deadline.
    #[must_use]
    pub fn deadline_reached(&self) -> bool {
        self.elapsed >= self.max_wait
    }
}
