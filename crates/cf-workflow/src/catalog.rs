//! The static set of workflows offered to users.

use std::sync::Arc;

use crate::step::Step;
use crate::workflow::Workflow;

/// Top-level workflows, in display order. Nested [`Step::Workflow`]
/// references are resolved against this catalog by name.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: Vec<Arc<Workflow>>,
}

impl WorkflowCatalog {
    pub fn new(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        Self {
            workflows: workflows.into_iter().map(Arc::new).collect(),
        }
    }

    /// The built-in workflows.
    pub fn builtin() -> Self {
        Self::new([
            Workflow::new("Web Ready")
                .description("Compress and convert a video for the web")
                .step(Step::feature("COMPRESS"))
                .step(Step::feature("CONVERT"))
                .child(
                    Workflow::new("Trimmed")
                        .description("Then cut it to a time range")
                        .step(Step::feature("TRIM")),
                )
                .child(
                    Workflow::new("Silent")
                        .description("Then drop the audio track")
                        .step(Step::feature("REMOVE_AUDIO")),
                ),
            Workflow::new("Social Square")
                .description("Crop and scale a video for social feeds")
                .step(Step::feature("CROP"))
                .step(Step::feature("RESIZE")),
            Workflow::new("Archive")
                .description("Web-ready copy in black and white")
                .step(Step::workflow("Web Ready"))
                .step(Step::feature("GRAYSCALE")),
        ])
    }

    pub fn with(mut self, workflow: Workflow) -> Self {
        self.workflows.push(Arc::new(workflow));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Workflow>> {
        self.workflows.iter().find(|w| w.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Workflow>> {
        self.workflows.iter()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
