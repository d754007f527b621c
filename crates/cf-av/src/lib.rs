//! # cf-av
//!
//! The ffmpeg side of clipforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and ffprobe, from
//!   configured paths or `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async process builder with a
//!   timeout; the child is killed when the future is dropped.
//! - **Workspace management** ([`Workspace`]) -- temporary directory holding
//!   intermediate step outputs.
//! - **[`FfmpegEngine`]** -- implements [`cf_session::Engine`] by running one
//!   ffmpeg process per compiled step.

pub mod command;
pub mod engine;
pub mod tools;
pub mod workspace;

pub use command::{ToolCommand, ToolOutput};
pub use engine::FfmpegEngine;
pub use tools::{ToolInfo, ToolRegistry};
pub use workspace::Workspace;
