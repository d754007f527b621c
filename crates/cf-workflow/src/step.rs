//! The schedulable unit of a workflow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Either a feature (by catalog key) or a reference to another workflow
/// (by name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Step {
    Feature(String),
    Workflow(String),
}

impl Step {
    pub fn feature(key: impl Into<String>) -> Self {
        Self::Feature(key.into())
    }

    pub fn workflow(name: impl Into<String>) -> Self {
        Self::Workflow(name.into())
    }

    /// The referenced key or name.
    pub fn target(&self) -> &str {
        match self {
            Self::Feature(key) => key,
            Self::Workflow(name) => name,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(key) => write!(f, "feature {key}"),
            Self::Workflow(name) => write!(f, "workflow {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let json = serde_json::to_value(Step::feature("CROP")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "feature", "ref": "CROP"}));
        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, Step::feature("CROP"));
    }

    #[test]
    fn display_names_kind() {
        assert_eq!(Step::workflow("Web Ready").to_string(), "workflow Web Ready");
        assert_eq!(Step::feature("TRIM").target(), "TRIM");
    }
}
