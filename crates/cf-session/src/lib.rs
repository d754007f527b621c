//! # cf-session
//!
//! The execution coordinator. A [`Session`] owns one [`ExecutionState`] and
//! walks it through
//! `Idle -> AwaitingConfiguration -> Compiling -> Ready -> Running -> Succeeded | Failed`,
//! submitting each compiled step to an [`Engine`] strictly in order.
//!
//! Sessions share nothing mutable: the [`cf_registry::CommandRegistry`] is
//! read-only and handed around as an `Arc`, so independent sessions may run
//! concurrently.

pub mod engine;
pub mod session;
pub mod state;

pub use engine::{Artifact, Engine, StepRequest};
pub use session::{AbortHandle, Session};
pub use state::{ExecutionReport, ExecutionState, SessionState, StepReport, StepStatus};
