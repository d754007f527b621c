//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds the built-in [`CommandRegistry`]
//! and a [`ScriptedEngine`] whose per-step behavior is set up front. The
//! engine writes a small file per step into a temp dir so artifacts can be
//! followed from one step to the next.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cf_core::config::{CatalogConfig, SessionConfig};
use cf_core::{Error, MediaType, Result, SessionId};
use cf_registry::CommandRegistry;
use cf_session::{Artifact, Engine, Session, StepRequest};
use parking_lot::Mutex;
use tempfile::TempDir;

/// What the engine does when it reaches a step.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed,
    Fail(String),
    /// Never completes; only an abort gets the session out.
    Hang,
}

/// One recorded `run_command` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub session: SessionId,
    pub index: usize,
    pub feature: String,
    pub args: Vec<String>,
    pub inputs: Vec<PathBuf>,
    pub output_type: MediaType,
}

/// An [`Engine`] that follows a script instead of running ffmpeg. Outputs
/// go to one subdirectory per session, like the ffmpeg engine's workspace.
pub struct ScriptedEngine {
    dir: TempDir,
    script: HashMap<usize, Outcome>,
    pub calls: Mutex<Vec<Call>>,
    pub abandoned: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create engine dir"),
            script: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            abandoned: AtomicUsize::new(0),
        }
    }

    /// Builder: behavior at flattened step `index` (default: succeed).
    pub fn at(mut self, index: usize, outcome: Outcome) -> Self {
        self.script.insert(index, outcome);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn run_command(&self, request: StepRequest<'_>) -> Result<Artifact> {
        self.calls.lock().push(Call {
            session: request.session,
            index: request.index,
            feature: request.feature.to_string(),
            args: request.command.args().to_vec(),
            inputs: request.inputs.iter().map(|a| a.path.clone()).collect(),
            output_type: request.output_type,
        });

        match self.script.get(&request.index).cloned().unwrap_or(Outcome::Succeed) {
            Outcome::Succeed => {
                let ext = request
                    .command
                    .container()
                    .map(|c| c.extension())
                    .unwrap_or("out");
                let dir = self.dir.path().join(request.session.to_string());
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("step-{}.{ext}", request.index));
                std::fs::write(&path, request.command.to_string())?;
                Ok(Artifact::new(path, request.output_type))
            }
            Outcome::Fail(message) => Err(Error::tool("ffmpeg", message)),
            Outcome::Hang => std::future::pending().await,
        }
    }

    async fn abandon(&self, _session: SessionId) {
        self.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

/// Built-in registry plus a scripted engine and a directory of inputs.
pub struct TestHarness {
    pub registry: Arc<CommandRegistry>,
    pub engine: Arc<ScriptedEngine>,
    inputs: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(ScriptedEngine::new())
    }

    pub fn with_engine(engine: ScriptedEngine) -> Self {
        let registry = CommandRegistry::builtin(&CatalogConfig::default())
            .expect("built-in registry must build");
        Self {
            registry: Arc::new(registry),
            engine: Arc::new(engine),
            inputs: tempfile::tempdir().expect("failed to create input dir"),
        }
    }

    pub fn session(&self) -> Session {
        Session::new(
            Arc::clone(&self.registry),
            self.engine.clone(),
            &SessionConfig::default(),
        )
    }

    /// Create an input file named `name` and return it as an artifact
    /// classified by extension.
    pub fn input(&self, name: &str) -> Artifact {
        let path = self.inputs.path().join(name);
        std::fs::write(&path, b"not really media").expect("failed to write input");
        Artifact::from_path(path)
    }
}
