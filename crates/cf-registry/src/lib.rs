//! # cf-registry
//!
//! The addressable tree of invocable commands. [`CommandRegistry::build`]
//! turns the feature and workflow catalogs into [`CommandNode`]s grouped under
//! the `Features` and `Workflows` categories, rejecting duplicate names and
//! dangling references. The registry is read-only after construction and is
//! shared across sessions behind an `Arc`.

pub mod node;
pub mod registry;

pub use node::{CommandKind, CommandNode};
pub use registry::{CommandRegistry, Selection, CLEAR, CUSTOM_RUN, FEATURES, WORKFLOWS};
