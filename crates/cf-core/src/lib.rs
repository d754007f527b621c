//! cf-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other cf-* crates,
//! providing the unified error type, media-type classification, typed
//! identifiers, application configuration, and the session event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
