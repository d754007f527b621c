//! # cf-workflow
//!
//! Workflows chain [`Step`]s (features or references to other workflows) into
//! multi-stage pipelines. The [`Compiler`] resolves a workflow against the
//! feature and workflow catalogs, checks that every adjacent pair of steps is
//! type-compatible, and compiles each leaf feature into a
//! [`CompiledPipeline`].

pub mod catalog;
pub mod compiler;
pub mod pipeline;
pub mod step;
pub mod workflow;

pub use catalog::WorkflowCatalog;
pub use compiler::{Compiler, PlannedStep};
pub use pipeline::{CompiledPipeline, CompiledStep, StepConfigs};
pub use step::Step;
pub use workflow::Workflow;
