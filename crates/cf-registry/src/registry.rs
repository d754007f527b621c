//! Registry construction, lookup and compilation of selections.

use std::collections::HashSet;

use cf_core::config::CatalogConfig;
use cf_core::{Error, Result};
use cf_feature::{FeatureCatalog, FeatureEntry};
use cf_workflow::{
    CompiledPipeline, Compiler, PlannedStep, Step, StepConfigs, Workflow, WorkflowCatalog,
};
use serde::{Deserialize, Serialize};

use crate::node::{CommandKind, CommandNode};

/// Name of the feature category.
pub const FEATURES: &str = "Features";
/// Name of the workflow category.
pub const WORKFLOWS: &str = "Workflows";
/// Top-level command running user-supplied transcoder arguments.
pub const CUSTOM_RUN: &str = "Custom Run";
/// Top-level command that resets the session.
pub const CLEAR: &str = "Clear";

const CUSTOM_RUN_KEY: &str = "CUSTOM_RUN";

/// A command chosen by the user: a registry path plus optional child
/// continuations beyond the ones named in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child: Vec<usize>,
}

impl Selection {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            child: Vec::new(),
        }
    }

    pub fn with_child(mut self, index: usize) -> Self {
        self.child.push(index);
        self
    }
}

/// The command tree plus the catalogs it was built from.
#[derive(Debug)]
pub struct CommandRegistry {
    roots: Vec<CommandNode>,
    features: FeatureCatalog,
    workflows: WorkflowCatalog,
}

impl CommandRegistry {
    /// Build the registry from the built-in catalogs.
    pub fn builtin(config: &CatalogConfig) -> Result<Self> {
        Self::build(FeatureCatalog::builtin(), WorkflowCatalog::builtin(), config)
    }

    /// Build the command tree.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryConstruction`] on duplicate keys or command names
    /// within one scope, steps referencing unknown features or workflows,
    /// cyclic workflow references, empty workflows, and direct features
    /// without a default configuration.
    pub fn build(
        features: FeatureCatalog,
        workflows: WorkflowCatalog,
        config: &CatalogConfig,
    ) -> Result<Self> {
        let mut keys = HashSet::new();
        for entry in features.iter() {
            if !keys.insert(entry.key()) {
                return Err(Error::RegistryConstruction(format!(
                    "duplicate feature key `{}`",
                    entry.key()
                )));
            }
        }
        // Names are checked before hiding or disabling, so configuration
        // cannot mask a catalog with two entries of the same name.
        unique_names(FEATURES, features.iter().map(|e| e.name()))?;
        unique_names(WORKFLOWS, workflows.iter().map(|wf| wf.name.as_str()))?;

        for hidden in &config.hidden_features {
            if features.get(hidden).is_none() {
                tracing::warn!("catalog.hidden_features names unknown feature `{hidden}`");
            }
        }
        for disabled in &config.disabled_workflows {
            if workflows.get(disabled).is_none() {
                tracing::warn!("catalog.disabled_workflows names unknown workflow `{disabled}`");
            }
        }

        let mut feature_nodes = Vec::new();
        for entry in features.iter() {
            if entry.is_hidden() || config.hidden_features.iter().any(|k| k == entry.key()) {
                continue;
            }
            push_unique(FEATURES, &mut feature_nodes, feature_node(entry)?)?;
        }

        let mut workflow_nodes = Vec::new();
        for wf in workflows.iter() {
            validate_references(wf, &features, &workflows, &mut Vec::new())?;
            if config.disabled_workflows.iter().any(|n| n == &wf.name) {
                continue;
            }
            push_unique(WORKFLOWS, &mut workflow_nodes, workflow_node(wf)?)?;
        }

        let mut roots = Vec::new();
        push_unique(
            "root",
            &mut roots,
            CommandNode {
                child: feature_nodes,
                ..CommandNode::category(FEATURES, "Single transformations")
            },
        )?;
        push_unique(
            "root",
            &mut roots,
            CommandNode {
                child: workflow_nodes,
                ..CommandNode::category(WORKFLOWS, "Multi-step pipelines")
            },
        )?;
        if let Some(custom) = features.get(CUSTOM_RUN_KEY) {
            push_unique(
                "root",
                &mut roots,
                CommandNode {
                    command: CUSTOM_RUN.to_string(),
                    ..feature_node(custom)?
                },
            )?;
        }
        push_unique(
            "root",
            &mut roots,
            CommandNode::action(CLEAR, "Discard the current selection and progress"),
        )?;

        tracing::info!(
            "Command registry built: {} feature(s), {} workflow(s)",
            roots[0].child.len(),
            roots[1].child.len()
        );

        Ok(Self {
            roots,
            features,
            workflows,
        })
    }

    pub fn roots(&self) -> &[CommandNode] {
        &self.roots
    }

    pub fn features(&self) -> &FeatureCatalog {
        &self.features
    }

    pub fn workflows(&self) -> &WorkflowCatalog {
        &self.workflows
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.features, &self.workflows)
    }

    /// Look up a node by `/`-separated path, e.g. `Workflows/Web Ready/Silent`.
    pub fn get(&self, path: &str) -> Option<&CommandNode> {
        self.walk(path).ok().and_then(|trail| trail.last().map(|(_, node)| *node))
    }

    /// Depth-first search of the whole tree for a node named `name`.
    pub fn find(&self, name: &str) -> Option<&CommandNode> {
        self.roots.iter().find_map(|root| root.find(name))
    }

    /// Every node with its full path, parents before children.
    pub fn paths(&self) -> Vec<(String, &CommandNode)> {
        fn visit<'n>(prefix: &str, node: &'n CommandNode, out: &mut Vec<(String, &'n CommandNode)>) {
            let path = if prefix.is_empty() {
                node.command.clone()
            } else {
                format!("{prefix}/{}", node.command)
            };
            out.push((path.clone(), node));
            for child in &node.child {
                visit(&path, child, out);
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            visit("", root, &mut out);
        }
        out
    }

    /// The workflow a selection compiles plus the child indices to follow.
    pub fn resolve(&self, selection: &Selection) -> Result<(Workflow, Vec<usize>)> {
        let trail = self.walk(&selection.path)?;
        let Some((_, target)) = trail.last() else {
            return Err(Error::not_found("command", &selection.path));
        };
        if !target.kind.is_compilable() {
            return Err(Error::Validation(format!(
                "`{}` is a {} and cannot be compiled",
                selection.path, target.kind
            )));
        }

        // The outermost compilable node owns the pipeline; deeper path
        // segments are child continuations.
        let Some(top) = trail.iter().position(|(_, node)| node.kind.is_compilable()) else {
            return Err(Error::Internal(format!("no pipeline on path `{}`", selection.path)));
        };
        let mut child_path: Vec<usize> = trail[top + 1..].iter().map(|(i, _)| *i).collect();
        child_path.extend_from_slice(&selection.child);
        Ok((trail[top].1.to_workflow(), child_path))
    }

    /// Flatten a selection into its leaf features with indices from `base`.
    pub fn plan(&self, selection: &Selection, base: usize) -> Result<Vec<PlannedStep>> {
        let (workflow, child_path) = self.resolve(selection)?;
        self.compiler().plan(&workflow, &child_path, base)
    }

    /// Compile one selection.
    pub fn compile(&self, selection: &Selection, configs: &StepConfigs) -> Result<CompiledPipeline> {
        self.compile_selection(std::slice::from_ref(selection), configs)
    }

    /// Compile several selections into a single pipeline, in order. Step
    /// indices run across the whole selection.
    pub fn compile_selection(
        &self,
        selections: &[Selection],
        configs: &StepConfigs,
    ) -> Result<CompiledPipeline> {
        let compiler = self.compiler();
        let mut pipeline = CompiledPipeline {
            name: String::new(),
            steps: Vec::new(),
        };
        for selection in selections {
            let (workflow, child_path) = self.resolve(selection)?;
            let next = compiler.compile_at(&workflow, &child_path, configs, pipeline.len())?;
            pipeline.append(next)?;
        }
        if pipeline.is_empty() {
            return Err(Error::Validation("nothing selected to compile".into()));
        }
        Ok(pipeline)
    }

    fn walk(&self, path: &str) -> Result<Vec<(usize, &CommandNode)>> {
        let mut trail: Vec<(usize, &CommandNode)> = Vec::new();
        let mut scope: &[CommandNode] = &self.roots;
        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let (index, node) = scope
                .iter()
                .enumerate()
                .find(|(_, n)| n.command == segment)
                .ok_or_else(|| Error::not_found("command", path))?;
            trail.push((index, node));
            scope = &node.child;
        }
        if trail.is_empty() {
            return Err(Error::not_found("command", path));
        }
        Ok(trail)
    }
}

fn feature_node(entry: &FeatureEntry) -> Result<CommandNode> {
    let kind = if entry.ui_handle().is_some() {
        CommandKind::Interactive
    } else {
        if entry.default_configuration().is_none() {
            return Err(Error::RegistryConstruction(format!(
                "direct feature `{}` has no default configuration",
                entry.key()
            )));
        }
        CommandKind::Direct
    };
    Ok(CommandNode {
        command: entry.name().to_string(),
        description: entry.summary().to_string(),
        kind,
        ui: entry.ui_handle().cloned(),
        child: Vec::new(),
        steps: vec![Step::feature(entry.key())],
    })
}

fn workflow_node(wf: &Workflow) -> Result<CommandNode> {
    if wf.steps.is_empty() {
        return Err(Error::RegistryConstruction(format!(
            "workflow `{}` has no steps",
            wf.name
        )));
    }
    let mut child = Vec::new();
    for c in &wf.child {
        push_unique(&wf.name, &mut child, workflow_node(c)?)?;
    }
    Ok(CommandNode {
        command: wf.name.clone(),
        description: wf.description.clone(),
        kind: CommandKind::Workflow,
        ui: None,
        child,
        steps: wf.steps.clone(),
    })
}

fn unique_names<'a>(scope: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::RegistryConstruction(format!(
                "duplicate command `{name}` in {scope}"
            )));
        }
    }
    Ok(())
}

fn push_unique(scope: &str, nodes: &mut Vec<CommandNode>, node: CommandNode) -> Result<()> {
    if nodes.iter().any(|n| n.command == node.command) {
        return Err(Error::RegistryConstruction(format!(
            "duplicate command `{}` in {scope}",
            node.command
        )));
    }
    nodes.push(node);
    Ok(())
}

/// Every step of `wf` and its children must reference a known feature or
/// workflow, without cycles through workflow references.
fn validate_references<'w>(
    wf: &'w Workflow,
    features: &FeatureCatalog,
    workflows: &'w WorkflowCatalog,
    stack: &mut Vec<&'w str>,
) -> Result<()> {
    if stack.contains(&wf.name.as_str()) {
        return Err(Error::RegistryConstruction(format!(
            "workflow `{}` references itself via {}",
            wf.name,
            stack.join(" -> ")
        )));
    }
    stack.push(&wf.name);
    for step in &wf.steps {
        match step {
            Step::Feature(key) => {
                if features.get(key).is_none() {
                    return Err(Error::RegistryConstruction(format!(
                        "workflow `{}` references unknown feature `{key}`",
                        wf.name
                    )));
                }
            }
            Step::Workflow(name) => {
                let nested = workflows.get(name).ok_or_else(|| {
                    Error::RegistryConstruction(format!(
                        "workflow `{}` references unknown workflow `{name}`",
                        wf.name
                    ))
                })?;
                validate_references(nested, features, workflows, stack)?;
            }
        }
    }
    for child in &wf.child {
        validate_references(child, features, workflows, stack)?;
    }
    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use cf_core::MediaType;
    use cf_feature::{Configuration, FileConfig};
    use cf_feature::features::{Crop, Grayscale};

    fn builtin() -> CommandRegistry {
        CommandRegistry::builtin(&CatalogConfig::default()).unwrap()
    }

    #[test]
    fn top_level_layout() {
        let registry = builtin();
        let names: Vec<_> = registry.roots().iter().map(|n| n.command.as_str()).collect();
        assert_eq!(names, [FEATURES, WORKFLOWS, CUSTOM_RUN, CLEAR]);
        assert_eq!(registry.get(CLEAR).unwrap().kind, CommandKind::Action);
        assert_eq!(registry.get(CUSTOM_RUN).unwrap().steps, [Step::feature("CUSTOM_RUN")]);
    }

    #[test]
    fn hidden_features_not_listed() {
        let registry = builtin();
        assert!(registry.get("Features/Custom Run").is_none());
        let hide_crop = CatalogConfig {
            hidden_features: vec!["CROP".into()],
            ..CatalogConfig::default()
        };
        let registry = CommandRegistry::builtin(&hide_crop).unwrap();
        assert!(registry.get("Features/Crop").is_none());
        let plan = registry.plan(&Selection::new("Workflows/Social Square"), 0).unwrap();
        assert_eq!(plan[0].entry.key(), "CROP");
    }

    #[test]
    fn direct_and_interactive_kinds() {
        let registry = builtin();
        let gray = registry.get("Features/Grayscale").unwrap();
        assert_eq!(gray.kind, CommandKind::Direct);
        assert!(gray.ui.is_none());
        let crop = registry.get("Features/Crop").unwrap();
        assert_eq!(crop.kind, CommandKind::Interactive);
        assert_eq!(crop.ui.as_ref().unwrap().as_str(), "crop");
    }

    #[test]
    fn round_trip_matches_catalog() {
        let registry = builtin();
        for entry in registry.features().iter().filter(|e| !e.is_hidden()) {
            let node = registry.get(&format!("{FEATURES}/{}", entry.name())).unwrap();
            assert_eq!(node.steps, [Step::feature(entry.key())]);
        }
        for wf in registry.workflows().iter() {
            let node = registry.get(&format!("{WORKFLOWS}/{}", wf.name)).unwrap();
            assert_eq!(node.steps, wf.steps);
            for child in &wf.child {
                let path = format!("{WORKFLOWS}/{}/{}", wf.name, child.name);
                assert_eq!(registry.get(&path).unwrap().steps, child.steps);
            }
        }
        for (path, node) in registry.paths() {
            assert_eq!(registry.get(&path), Some(node));
        }
    }

    #[test]
    fn duplicate_crop_is_fatal() {
        let features = FeatureCatalog::builtin().with(FeatureEntry::new(
            "CROP_2",
            "Crop",
            FileConfig::single(MediaType::Video),
            Crop,
        ).ui("crop"));
        let err =
            CommandRegistry::build(features, WorkflowCatalog::builtin(), &CatalogConfig::default())
                .unwrap_err();
        assert_matches!(err, Error::RegistryConstruction(ref msg) if msg.contains("`Crop`"));
    }

    #[test]
    fn duplicates_are_fatal_even_when_filtered_out() {
        let workflows = WorkflowCatalog::builtin()
            .with(Workflow::new("Archive").step(Step::feature("GRAYSCALE")));
        let config = CatalogConfig {
            disabled_workflows: vec!["Archive".into()],
            ..CatalogConfig::default()
        };
        assert_matches!(
            CommandRegistry::build(FeatureCatalog::builtin(), workflows, &config),
            Err(Error::RegistryConstruction(ref msg)) if msg.contains("`Archive`")
        );

        let features = FeatureCatalog::builtin().with(
            FeatureEntry::new("CROP_2", "Crop", FileConfig::single(MediaType::Video), Crop)
                .ui("crop")
                .hidden(),
        );
        assert_matches!(
            CommandRegistry::build(features, WorkflowCatalog::builtin(), &CatalogConfig::default()),
            Err(Error::RegistryConstruction(ref msg)) if msg.contains("`Crop`")
        );
    }

    #[test]
    fn duplicate_key_is_fatal() {
        let features = FeatureCatalog::builtin().with(FeatureEntry::new(
            "GRAYSCALE",
            "Grayscale Again",
            FileConfig::single(MediaType::Video),
            Grayscale,
        ).defaults(Configuration::new()));
        assert_matches!(
            CommandRegistry::build(features, WorkflowCatalog::builtin(), &CatalogConfig::default()),
            Err(Error::RegistryConstruction(_))
        );
    }

    #[test]
    fn direct_feature_needs_defaults() {
        let features = FeatureCatalog::new([FeatureEntry::new(
            "GRAYSCALE",
            "Grayscale",
            FileConfig::single(MediaType::Video),
            Grayscale,
        )]);
        assert_matches!(
            CommandRegistry::build(features, WorkflowCatalog::default(), &CatalogConfig::default()),
            Err(Error::RegistryConstruction(ref msg)) if msg.contains("default configuration")
        );
    }

    #[test]
    fn dangling_and_cyclic_references() {
        let dangling = WorkflowCatalog::new([Workflow::new("Bad").step(Step::feature("SHARPEN"))]);
        assert_matches!(
            CommandRegistry::build(FeatureCatalog::builtin(), dangling, &CatalogConfig::default()),
            Err(Error::RegistryConstruction(ref msg)) if msg.contains("SHARPEN")
        );

        let cyclic = WorkflowCatalog::new([
            Workflow::new("Loop").step(Step::feature("GRAYSCALE")).step(Step::workflow("Loop")),
        ]);
        assert_matches!(
            CommandRegistry::build(FeatureCatalog::builtin(), cyclic, &CatalogConfig::default()),
            Err(Error::RegistryConstruction(ref msg)) if msg.contains("references itself")
        );
    }

    #[test]
    fn disabled_workflows_are_omitted() {
        let config = CatalogConfig {
            disabled_workflows: vec!["Archive".into()],
            ..CatalogConfig::default()
        };
        let registry = CommandRegistry::builtin(&config).unwrap();
        assert!(registry.get("Workflows/Archive").is_none());
        assert!(registry.get("Workflows/Web Ready").is_some());
    }

    #[test]
    fn resolve_child_from_path() {
        let registry = builtin();
        let (wf, child) = registry
            .resolve(&Selection::new("Workflows/Web Ready/Silent"))
            .unwrap();
        assert_eq!(wf.name, "Web Ready");
        assert_eq!(child, [1]);

        let (_, child) = registry
            .resolve(&Selection::new("Workflows/Web Ready").with_child(0))
            .unwrap();
        assert_eq!(child, [0]);
    }

    #[test]
    fn categories_and_actions_do_not_compile() {
        let registry = builtin();
        for path in [FEATURES, CLEAR] {
            assert_matches!(
                registry.compile(&Selection::new(path), &StepConfigs::new()),
                Err(Error::Validation(_))
            );
        }
        assert_matches!(
            registry.compile(&Selection::new("Features/Sharpen"), &StepConfigs::new()),
            Err(Error::NotFound { .. })
        );
    }

    #[test]
    fn selection_indices_span_commands() {
        let registry = builtin();
        let mut trim = Configuration::new();
        trim.set("TRIM.START", 1).set("TRIM.END", 2);
        let pipeline = registry
            .compile_selection(
                &[
                    Selection::new("Workflows/Web Ready"),
                    Selection::new("Features/Trim"),
                    Selection::new("Features/Grayscale"),
                ],
                &StepConfigs::new().with(2, trim),
            )
            .unwrap();
        let indices: Vec<_> = pipeline.steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
        assert_eq!(pipeline.steps[3].command().to_string(), "-vf hue=s=0");
    }

    #[test]
    fn selection_checks_boundaries() {
        let registry = builtin();
        let mut volume = Configuration::new();
        volume.set("VOLUME.LEVEL", 2.0);
        assert_matches!(
            registry.compile_selection(
                &[Selection::new("Features/Grayscale"), Selection::new("Features/Change Volume")],
                &StepConfigs::new().with(1, volume),
            ),
            Err(Error::IncompatibleStep { from: 0, to: 1, .. })
        );
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandRegistry>();
    }
}
