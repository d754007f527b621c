//! Session state, per-step status and execution reports.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use cf_registry::Selection;
use cf_workflow::StepConfigs;
use serde::Serialize;

use crate::engine::Artifact;

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    Idle,
    AwaitingConfiguration,
    Compiling,
    Ready,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::AwaitingConfiguration => "AwaitingConfiguration",
            Self::Compiling => "Compiling",
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// What the user chose and how far execution got. Cleared on reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionState {
    /// Selected commands, in order.
    pub chosen: Vec<Selection>,
    /// Configurations keyed by flattened step index.
    pub configs: StepConfigs,
    pub submitted: bool,
    pub current_step: Option<usize>,
    pub progress_by_step: BTreeMap<usize, StepStatus>,
}

impl ExecutionState {
    pub fn status(&self, index: usize) -> Option<StepStatus> {
        self.progress_by_step.get(&index).copied()
    }
}

/// Timing of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub feature: String,
    pub elapsed: Duration,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub steps: Vec<StepReport>,
    pub output: Artifact,
}

impl ExecutionReport {
    pub fn total_elapsed(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }
}
