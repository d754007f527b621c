//! The [`Feature`] trait and the catalog metadata wrapped around it.
//!
//! A feature is a pure function from [`Configuration`] to [`CompiledCommand`]:
//! the same configuration always yields the same command or the same error.
//! Built-in features implement [`Schema`], which splits that function into
//! `parse` (extract and type-check the leaves) and `synthesize` (derive the
//! arguments, checking cross-field invariants); a blanket impl turns every
//! `Schema` into a `Feature`.

use std::fmt;
use std::sync::Arc;

use cf_core::{Container, Result};
use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;
use crate::file_config::FileConfig;

// ---------------------------------------------------------------------------
// CompiledCommand
// ---------------------------------------------------------------------------

/// Engine-ready transcoder arguments produced by a feature.
///
/// The `Display` form is the opaque argument string handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompiledCommand {
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    container: Option<Container>,
}

impl CompiledCommand {
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            container: None,
        }
    }

    /// Builder: the output container this command switches to.
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Output container, when the command changes it.
    pub fn container(&self) -> Option<Container> {
        self.container
    }
}

impl fmt::Display for CompiledCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Feature / Schema
// ---------------------------------------------------------------------------

/// A single media transformation.
pub trait Feature: Send + Sync {
    /// Check that `config` compiles, without keeping the result.
    fn validate(&self, config: &Configuration) -> Result<()>;

    /// Compile `config` into transcoder arguments.
    fn compile(&self, config: &Configuration) -> Result<CompiledCommand>;
}

/// Typed configuration schema of a feature.
pub trait Schema: Send + Sync + 'static {
    /// Typed fields extracted from a configuration.
    type Settings;

    /// The closed set of leaf paths `parse` reads.
    const PATHS: &'static [&'static str];

    /// Extract and type-check the leaves this feature needs.
    fn parse(&self, config: &Configuration) -> Result<Self::Settings>;

    /// Derive the command from typed fields.
    fn synthesize(&self, settings: &Self::Settings) -> Result<CompiledCommand>;
}

impl<T: Schema> Feature for T {
    fn validate(&self, config: &Configuration) -> Result<()> {
        self.compile(config).map(drop)
    }

    fn compile(&self, config: &Configuration) -> Result<CompiledCommand> {
        for path in config.leaf_paths() {
            if !T::PATHS.contains(&path.as_str()) {
                tracing::debug!("Ignoring unexpected configuration leaf `{path}`");
            }
        }
        let settings = self.parse(config)?;
        self.synthesize(&settings)
    }
}

// ---------------------------------------------------------------------------
// Presentation metadata
// ---------------------------------------------------------------------------

/// Display name and color of the progress indicator for a running step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDescriptor {
    pub label: String,
    pub color: String,
}

impl ProgressDescriptor {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

impl Default for ProgressDescriptor {
    fn default() -> Self {
        Self::new("Processing ...", "#5596FF")
    }
}

/// Opaque handle the presentation layer resolves to a configuration form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiHandle(String);

impl UiHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FeatureEntry
// ---------------------------------------------------------------------------

/// Catalog declaration of a feature.
///
/// The file config is fixed at construction; everything else is set through
/// builder methods while the catalog is assembled.
#[derive(Clone)]
pub struct FeatureEntry {
    key: String,
    name: String,
    description: String,
    file_config: FileConfig,
    progress: ProgressDescriptor,
    ui: Option<UiHandle>,
    hidden: bool,
    defaults: Option<Configuration>,
    feature: Arc<dyn Feature>,
}

impl FeatureEntry {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        file_config: FileConfig,
        feature: impl Feature + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            file_config,
            progress: ProgressDescriptor::default(),
            ui: None,
            hidden: false,
            defaults: None,
            feature: Arc::new(feature),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn progress(mut self, label: impl Into<String>, color: impl Into<String>) -> Self {
        self.progress = ProgressDescriptor::new(label, color);
        self
    }

    pub fn ui(mut self, handle: impl Into<String>) -> Self {
        self.ui = Some(UiHandle::new(handle));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn defaults(mut self, defaults: Configuration) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.description
    }

    pub fn file_config(&self) -> &FileConfig {
        &self.file_config
    }

    pub fn progress_descriptor(&self) -> &ProgressDescriptor {
        &self.progress
    }

    pub fn ui_handle(&self) -> Option<&UiHandle> {
        self.ui.as_ref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Configuration used when the user supplies none.
    pub fn default_configuration(&self) -> Option<&Configuration> {
        self.defaults.as_ref()
    }

    /// The underlying feature implementation.
    pub fn feature(&self) -> &dyn Feature {
        self.feature.as_ref()
    }

    /// Compile `config` into an immutable [`FeatureInstance`].
    pub fn instantiate(&self, config: &Configuration) -> Result<FeatureInstance> {
        let command = self.feature.compile(config)?;
        tracing::debug!("Compiled {}: {}", self.name, command);
        Ok(FeatureInstance {
            key: self.key.clone(),
            name: self.name.clone(),
            file_config: self.file_config.clone(),
            progress: self.progress.clone(),
            command,
        })
    }
}

impl fmt::Debug for FeatureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureEntry")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("file_config", &self.file_config)
            .field("ui", &self.ui)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FeatureInstance
// ---------------------------------------------------------------------------

/// A feature compiled against a finalized configuration. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInstance {
    key: String,
    name: String,
    file_config: FileConfig,
    progress: ProgressDescriptor,
    command: CompiledCommand,
}

impl FeatureInstance {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_config(&self) -> &FileConfig {
        &self.file_config
    }

    pub fn progress(&self) -> &ProgressDescriptor {
        &self.progress
    }

    pub fn command(&self) -> &CompiledCommand {
        &self.command
    }
}
