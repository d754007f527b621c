//! Workflow definitions.

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// An ordered chain of steps, optionally followed by alternative child
/// workflows the user may pick after the parent completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child: Vec<Workflow>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            child: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn child(mut self, child: Workflow) -> Self {
        self.child.push(child);
        self
    }

    /// Follow `path` through nested children.
    pub fn descendant(&self, path: &[usize]) -> Option<&Workflow> {
        path.iter().try_fold(self, |wf, &i| wf.child.get(i))
    }
}
