//! Unified error type for clipforge.
//!
//! Compilation failures ([`Error::Configuration`], [`Error::InvariantViolation`],
//! [`Error::IncompatibleStep`], [`Error::UnsupportedInput`]) are recoverable:
//! the user corrects the input and resubmits. [`Error::RegistryConstruction`]
//! is a catalog authoring bug and aborts session startup.

/// Unified error type covering all failure modes in clipforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required configuration leaf is missing or has the wrong type.
    #[error("Configuration error at `{path}`: {message}")]
    Configuration {
        /// Dotted path of the offending leaf (e.g. `ASPECT_RATIO.WIDTH`).
        path: String,
        /// Human-readable error description.
        message: String,
    },

    /// A feature's cross-field consistency check failed.
    #[error("Invariant violated in {feature}: {message}")]
    InvariantViolation {
        /// Name of the feature that rejected its configuration.
        feature: String,
        /// The violated constraint.
        message: String,
    },

    /// Two adjacent workflow steps are not type-compatible.
    #[error("Incompatible steps {from} -> {to} in {workflow}: {message}")]
    IncompatibleStep {
        /// Workflow in which the pair was declared.
        workflow: String,
        /// Declared index of the producing step.
        from: usize,
        /// Declared index of the consuming step.
        to: usize,
        /// Human-readable error description.
        message: String,
    },

    /// The intake artifacts do not satisfy the first step's file constraints.
    #[error("Unsupported input for step {step} ({feature}): {message}")]
    UnsupportedInput {
        /// Flattened index of the rejecting step.
        step: usize,
        /// Name of the rejecting feature.
        feature: String,
        /// Human-readable error description.
        message: String,
    },

    /// The command catalog is malformed (duplicate names, dangling references).
    #[error("Registry construction error: {0}")]
    RegistryConstruction(String),

    /// The external transcoding engine failed while running a step.
    #[error("Engine error at step {step} ({feature}): {message}")]
    EngineExecution {
        /// Flattened index of the failed step.
        step: usize,
        /// Name of the feature whose command failed.
        feature: String,
        /// Engine-specific error description.
        message: String,
    },

    /// A session operation was requested in a state that does not allow it.
    #[error("Cannot {action} while session is {from}")]
    InvalidTransition {
        /// The session state at the time of the request.
        from: String,
        /// The requested operation.
        action: String,
    },

    /// In-flight work was abandoned by a session reset.
    #[error("Execution cancelled")]
    Cancelled,

    /// Lookup of a command, feature or workflow failed.
    #[error("{entity} not found: {name}")]
    NotFound {
        /// The kind of entity (e.g. "command", "feature").
        entity: String,
        /// The name that was looked up.
        name: String,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration file data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the user can resolve this error by fixing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. }
                | Error::InvariantViolation { .. }
                | Error::UnsupportedInput { .. }
        )
    }

    /// The step index this error refers to, if any.
    ///
    /// For [`Error::IncompatibleStep`] this is the consuming step.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Error::IncompatibleStep { to, .. } => Some(*to),
            Error::UnsupportedInput { step, .. } | Error::EngineExecution { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// Convenience constructor for [`Error::Configuration`].
    pub fn configuration(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::InvariantViolation`].
    pub fn invariant(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvariantViolation {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::InvalidTransition`].
    pub fn transition(from: impl std::fmt::Display, action: impl Into<String>) -> Self {
        Error::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
