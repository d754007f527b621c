//! Workflow compilation.
//!
//! Compilation walks the steps in declaration order, expanding nested
//! workflow references depth-first, and checks every adjacent pair before
//! moving on: the producer's output type (the primary type of its last leaf
//! feature) must be accepted, as a single input, by the consumer's file
//! config (that of its first leaf feature). Leaf features are then compiled
//! against the configuration for their flattened index.

use std::sync::Arc;

use cf_core::{Error, MediaType, Result};
use cf_feature::{FeatureCatalog, FeatureEntry, FileConfig};

use crate::catalog::WorkflowCatalog;
use crate::pipeline::{CompiledPipeline, CompiledStep, StepConfigs};
use crate::step::Step;
use crate::workflow::Workflow;

/// A leaf feature at its flattened position, before compilation.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub index: usize,
    pub entry: Arc<FeatureEntry>,
}

#[derive(Clone, Copy)]
enum Edge {
    First,
    Last,
}

/// Resolves workflows against the feature and workflow catalogs.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    features: &'a FeatureCatalog,
    workflows: &'a WorkflowCatalog,
}

impl<'a> Compiler<'a> {
    pub fn new(features: &'a FeatureCatalog, workflows: &'a WorkflowCatalog) -> Self {
        Self {
            features,
            workflows,
        }
    }

    /// Flatten `workflow` (plus the children selected by `child_path`) into
    /// leaf features, checking step compatibility along the way.
    ///
    /// Indices start at `base`.
    pub fn plan(
        &self,
        workflow: &Workflow,
        child_path: &[usize],
        base: usize,
    ) -> Result<Vec<PlannedStep>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        self.expand(workflow, base, &mut stack, &mut out)?;

        let mut parent = workflow;
        for &n in child_path {
            let child = parent.child.get(n).ok_or_else(|| {
                Error::not_found("child workflow", format!("{} #{n}", parent.name))
            })?;
            if let (Some(last), Some(first)) = (parent.steps.last(), child.steps.first()) {
                let from = parent.steps.len() - 1;
                self.check_pair(&parent.name, from, last, from + 1, first)?;
            }
            self.expand(child, base, &mut stack, &mut out)?;
            parent = child;
        }
        Ok(out)
    }

    /// Plan and compile `workflow`, starting at flattened index 0.
    pub fn compile(
        &self,
        workflow: &Workflow,
        child_path: &[usize],
        configs: &StepConfigs,
    ) -> Result<CompiledPipeline> {
        self.compile_at(workflow, child_path, configs, 0)
    }

    /// Plan and compile `workflow` with flattened indices starting at `base`.
    pub fn compile_at(
        &self,
        workflow: &Workflow,
        child_path: &[usize],
        configs: &StepConfigs,
        base: usize,
    ) -> Result<CompiledPipeline> {
        let plan = self.plan(workflow, child_path, base)?;
        let steps = plan
            .into_iter()
            .map(|planned| {
                let config = configs.resolve(planned.index, &planned.entry)?;
                Ok(CompiledStep {
                    index: planned.index,
                    instance: planned.entry.instantiate(config)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("Compiled {} into {} step(s)", workflow.name, steps.len());
        Ok(CompiledPipeline {
            name: workflow.name.clone(),
            steps,
        })
    }

    /// Check `workflow` and every workflow it references without compiling
    /// any feature. Every child continuation is checked against its parent.
    pub fn check(&self, workflow: &Workflow) -> Result<()> {
        self.check_from(workflow, &mut Vec::new())
    }

    fn check_from(&self, root: &Workflow, path: &mut Vec<usize>) -> Result<()> {
        self.plan(root, path, 0)?;
        let children = root.descendant(path).map_or(0, |wf| wf.child.len());
        for i in 0..children {
            path.push(i);
            self.check_from(root, path)?;
            path.pop();
        }
        Ok(())
    }

    /// Media type produced by `step`.
    pub fn output_type(&self, step: &Step) -> Result<MediaType> {
        Ok(self
            .edge(step, Edge::Last, &mut Vec::new())?
            .file_config()
            .primary_type())
    }

    /// File config governing what `step` accepts.
    pub fn input_config(&self, step: &Step) -> Result<FileConfig> {
        Ok(self
            .edge(step, Edge::First, &mut Vec::new())?
            .file_config()
            .clone())
    }

    fn expand<'w>(
        &'w self,
        workflow: &'w Workflow,
        base: usize,
        stack: &mut Vec<&'w str>,
        out: &mut Vec<PlannedStep>,
    ) -> Result<()> {
        enter(stack, &workflow.name)?;
        if workflow.steps.is_empty() {
            return Err(Error::RegistryConstruction(format!(
                "workflow `{}` has no steps",
                workflow.name
            )));
        }

        for (i, step) in workflow.steps.iter().enumerate() {
            if i > 0 {
                self.check_pair(&workflow.name, i - 1, &workflow.steps[i - 1], i, step)?;
            }
            match step {
                Step::Feature(key) => out.push(PlannedStep {
                    index: base + out.len(),
                    entry: Arc::clone(self.feature(key)?),
                }),
                Step::Workflow(name) => {
                    let nested = self.workflow(name)?;
                    self.expand(nested, base, stack, out)?;
                }
            }
        }

        stack.pop();
        Ok(())
    }

    fn check_pair(
        &self,
        workflow: &str,
        from: usize,
        producer: &Step,
        to: usize,
        consumer: &Step,
    ) -> Result<()> {
        let produced = self.output_type(producer)?;
        let accepts = self.input_config(consumer)?;
        accepts
            .check(produced, 1)
            .map_err(|message| Error::IncompatibleStep {
                workflow: workflow.to_string(),
                from,
                to,
                message: format!("{producer} produces {produced}, but {consumer}: {message}"),
            })
    }

    /// The leaf feature at one end of `step`.
    fn edge<'w>(
        &'w self,
        step: &'w Step,
        edge: Edge,
        stack: &mut Vec<&'w str>,
    ) -> Result<&'w Arc<FeatureEntry>> {
        match step {
            Step::Feature(key) => self.feature(key),
            Step::Workflow(name) => {
                enter(stack, name)?;
                let nested = self.workflow(name)?;
                let inner = match edge {
                    Edge::First => nested.steps.first(),
                    Edge::Last => nested.steps.last(),
                }
                .ok_or_else(|| {
                    Error::RegistryConstruction(format!("workflow `{name}` has no steps"))
                })?;
                let found = self.edge(inner, edge, stack)?;
                stack.pop();
                Ok(found)
            }
        }
    }

    fn feature(&self, key: &str) -> Result<&'a Arc<FeatureEntry>> {
        self.features
            .get(key)
            .ok_or_else(|| Error::not_found("feature", key))
    }

    fn workflow(&self, name: &str) -> Result<&'a Arc<Workflow>> {
        self.workflows
            .get(name)
            .ok_or_else(|| Error::not_found("workflow", name))
    }
}

/// Push `name` onto the expansion stack, rejecting cycles.
fn enter<'w>(stack: &mut Vec<&'w str>, name: &'w str) -> Result<()> {
    if stack.contains(&name) {
        let mut chain = stack.join(" -> ");
        chain.push_str(" -> ");
        chain.push_str(name);
        return Err(Error::RegistryConstruction(format!(
            "workflow cycle: {chain}"
        )));
    }
    stack.push(name);
    Ok(())
}
