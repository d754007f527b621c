//! Registry tree nodes.

use cf_feature::UiHandle;
use cf_workflow::{Step, Workflow};
use serde::Serialize;

/// How a node behaves when selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Groups other commands; not selectable itself.
    Category,
    /// A feature that needs a configuration form.
    Interactive,
    /// A feature runnable immediately with its default configuration.
    Direct,
    /// A multi-step workflow; its children are alternative continuations.
    Workflow,
    /// A session command that compiles nothing (e.g. `Clear`).
    Action,
}

impl CommandKind {
    /// Whether selecting this kind yields a compilable pipeline.
    pub fn is_compilable(self) -> bool {
        matches!(self, Self::Interactive | Self::Direct | Self::Workflow)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Interactive => write!(f, "interactive"),
            Self::Direct => write!(f, "direct"),
            Self::Workflow => write!(f, "workflow"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// One addressable entry of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandNode {
    pub command: String,
    pub description: String,
    pub kind: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiHandle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child: Vec<CommandNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl CommandNode {
    pub fn category(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            kind: CommandKind::Category,
            ui: None,
            child: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn action(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Action,
            ..Self::category(command, description)
        }
    }

    /// Rebuild the workflow this node (and its children) describes.
    pub fn to_workflow(&self) -> Workflow {
        Workflow {
            name: self.command.clone(),
            description: self.description.clone(),
            steps: self.steps.clone(),
            child: self.child.iter().map(CommandNode::to_workflow).collect(),
        }
    }

    /// Depth-first search for a descendant (or self) named `name`.
    pub fn find(&self, name: &str) -> Option<&CommandNode> {
        if self.command == name {
            return Some(self);
        }
        self.child.iter().find_map(|c| c.find(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_workflow_keeps_children() {
        let node = CommandNode {
            command: "Web Ready".into(),
            description: String::new(),
            kind: CommandKind::Workflow,
            ui: None,
            child: vec![CommandNode {
                command: "Silent".into(),
                description: String::new(),
                kind: CommandKind::Workflow,
                ui: None,
                child: Vec::new(),
                steps: vec![Step::feature("REMOVE_AUDIO")],
            }],
            steps: vec![Step::feature("COMPRESS"), Step::feature("CONVERT")],
        };
        let wf = node.to_workflow();
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.child[0].name, "Silent");
        assert_eq!(node.find("Silent").unwrap().steps, wf.child[0].steps);
    }

    #[test]
    fn only_pipelines_compile() {
        assert!(CommandKind::Direct.is_compilable());
        assert!(!CommandKind::Category.is_compilable());
        assert!(!CommandNode::action("Clear", "").kind.is_compilable());
    }

    #[test]
    fn empty_fields_are_omitted_from_json() {
        let json = serde_json::to_value(CommandNode::action("Clear", "Reset the session")).unwrap();
        assert_eq!(json["kind"], "action");
        assert_eq!(json["command"], "Clear");
        assert!(json.get("ui").is_none());
        assert!(json.get("child").is_none());
        assert!(json.get("steps").is_none());
    }
}
