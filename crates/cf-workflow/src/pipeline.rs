//! Compiled pipelines and the per-step configurations that produce them.

use std::collections::BTreeMap;

use cf_core::{Error, MediaType, Result};
use cf_feature::{CompiledCommand, Configuration, FeatureEntry, FeatureInstance, ProgressDescriptor};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StepConfigs
// ---------------------------------------------------------------------------

/// User-supplied configurations keyed by flattened step index.
///
/// In JSON the keys are the indices as strings:
/// `{"0": {"COMPRESS": {"CRF": {"value": 28}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepConfigs(BTreeMap<usize, Configuration>);

impl StepConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration("<steps>", format!("invalid step configurations: {e}")))
    }

    /// Builder: configuration for step `index`.
    pub fn with(mut self, index: usize, config: Configuration) -> Self {
        self.0.insert(index, config);
        self
    }

    pub fn insert(&mut self, index: usize, config: Configuration) {
        self.0.insert(index, config);
    }

    pub fn get(&self, index: usize) -> Option<&Configuration> {
        self.0.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Configurations in step order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Configuration)> {
        self.0.iter().map(|(index, config)| (*index, config))
    }

    /// The configuration used for step `index`: the explicit one, else the
    /// feature's defaults.
    pub fn resolve<'a>(&'a self, index: usize, entry: &'a FeatureEntry) -> Result<&'a Configuration> {
        self.get(index)
            .or_else(|| entry.default_configuration())
            .ok_or_else(|| {
                Error::configuration(
                    entry.key(),
                    format!("step {index} ({}) needs a configuration", entry.name()),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// CompiledStep
// ---------------------------------------------------------------------------

/// One leaf feature of a pipeline, compiled and ready for the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledStep {
    /// Flattened position in the pipeline.
    pub index: usize,
    pub instance: FeatureInstance,
}

impl CompiledStep {
    pub fn name(&self) -> &str {
        self.instance.name()
    }

    pub fn command(&self) -> &CompiledCommand {
        self.instance.command()
    }

    pub fn progress(&self) -> &ProgressDescriptor {
        self.instance.progress()
    }

    /// Media type of the artifact this step produces.
    pub fn output_type(&self) -> MediaType {
        self.instance.file_config().primary_type()
    }
}

// ---------------------------------------------------------------------------
// CompiledPipeline
// ---------------------------------------------------------------------------

/// An ordered, type-checked list of compiled steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPipeline {
    pub name: String,
    pub steps: Vec<CompiledStep>,
}

impl CompiledPipeline {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the intake artifacts against the first step's file config.
    pub fn check_inputs(&self, inputs: &[MediaType]) -> Result<()> {
        let Some(first) = self.steps.first() else {
            return Ok(());
        };
        first
            .instance
            .file_config()
            .check_inputs(inputs)
            .map_err(|message| Error::UnsupportedInput {
                step: first.index,
                feature: first.name().to_string(),
                message,
            })
    }

    /// Continue this pipeline with `next`, which must accept this pipeline's
    /// output as its single input.
    pub fn append(&mut self, next: CompiledPipeline) -> Result<()> {
        if let (Some(last), Some(first)) = (self.steps.last(), next.steps.first()) {
            let produced = last.output_type();
            first
                .instance
                .file_config()
                .check(produced, 1)
                .map_err(|message| Error::IncompatibleStep {
                    workflow: format!("{} + {}", self.name, next.name),
                    from: last.index,
                    to: first.index,
                    message: format!("{} produces {produced}: {message}", last.name()),
                })?;
        }
        self.name = if self.steps.is_empty() {
            next.name
        } else {
            format!("{} + {}", self.name, next.name)
        };
        self.steps.extend(next.steps);
        Ok(())
    }
}
