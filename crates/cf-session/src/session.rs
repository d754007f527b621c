//! The session state machine.

use std::sync::Arc;
use std::time::Instant;

use cf_core::config::SessionConfig;
use cf_core::events::{EventBus, EventPayload};
use cf_core::{Error, MediaType, Result, SessionId};
use cf_feature::Configuration;
use cf_registry::{CommandKind, CommandRegistry, Selection};
use cf_workflow::{CompiledPipeline, PlannedStep};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::engine::{Artifact, Engine, StepRequest};
use crate::state::{ExecutionReport, ExecutionState, SessionState, StepReport, StepStatus};

/// The cancellation token of the run in flight, if any. Each run installs
/// a fresh token, so an abort outside a run has nothing to cancel.
#[derive(Debug, Default)]
struct TokenSlot(Mutex<Option<CancellationToken>>);

impl TokenSlot {
    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.0.lock() = Some(token.clone());
        token
    }

    fn cancel(&self) {
        if let Some(token) = self.0.lock().take() {
            token.cancel();
        }
    }

    fn finish(&self) {
        self.0.lock().take();
    }
}

/// Abandons whatever the owning session is running.
///
/// Obtained from [`Session::abort_handle`]; stays valid across resets.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    slot: Arc<TokenSlot>,
}

impl AbortHandle {
    /// No effect unless a run is in flight.
    pub fn abort(&self) {
        self.slot.cancel();
    }
}

/// One user session: a selection, its configurations, the compiled pipeline
/// and the progress of running it.
pub struct Session {
    id: SessionId,
    registry: Arc<CommandRegistry>,
    engine: Arc<dyn Engine>,
    events: Arc<EventBus>,
    state: SessionState,
    execution: ExecutionState,
    pipeline: Option<CompiledPipeline>,
    last_error: Option<String>,
    cancel: Arc<TokenSlot>,
}

impl Session {
    pub fn new(
        registry: Arc<CommandRegistry>,
        engine: Arc<dyn Engine>,
        config: &SessionConfig,
    ) -> Self {
        Self::with_events(registry, engine, Arc::new(EventBus::new(config.event_capacity)))
    }

    /// Create a session publishing to an existing event bus.
    pub fn with_events(
        registry: Arc<CommandRegistry>,
        engine: Arc<dyn Engine>,
        events: Arc<EventBus>,
    ) -> Self {
        let id = SessionId::new();
        tracing::debug!("Session {id} created");
        Self {
            id,
            registry,
            engine,
            events,
            state: SessionState::Idle,
            execution: ExecutionState::default(),
            pipeline: None,
            last_error: None,
            cancel: Arc::new(TokenSlot::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn execution(&self) -> &ExecutionState {
        &self.execution
    }

    /// The compiled pipeline, once `submit` has succeeded.
    pub fn pipeline(&self) -> Option<&CompiledPipeline> {
        self.pipeline.as_ref()
    }

    /// Message of the error that moved the session to `Failed`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            slot: Arc::clone(&self.cancel),
        }
    }

    // -----------------------------------------------------------------------
    // Selection and configuration
    // -----------------------------------------------------------------------

    /// Choose the commands to run, in order.
    ///
    /// Choosing the `Clear` action resets the session instead, from any
    /// state.
    pub fn select(&mut self, selections: Vec<Selection>) -> Result<()> {
        let mut nodes = Vec::with_capacity(selections.len());
        for selection in &selections {
            let node = self
                .registry
                .get(&selection.path)
                .ok_or_else(|| Error::not_found("command", &selection.path))?;
            nodes.push(node.kind);
        }
        if nodes.contains(&CommandKind::Action) {
            if selections.len() > 1 {
                return Err(Error::Validation(
                    "an action cannot be combined with other commands".into(),
                ));
            }
            self.reset();
            return Ok(());
        }

        self.require_state(&[SessionState::Idle, SessionState::AwaitingConfiguration], "select")?;
        if selections.is_empty() {
            return Err(Error::Validation("nothing selected".into()));
        }
        for selection in &selections {
            self.registry.resolve(selection)?;
        }

        self.events.broadcast(
            self.id,
            EventPayload::Selected {
                commands: selections.iter().map(|s| s.path.clone()).collect(),
            },
        );
        self.execution.chosen = selections;
        self.execution.configs = Default::default();
        self.transition(SessionState::AwaitingConfiguration);
        Ok(())
    }

    /// Flattened steps of the current selection.
    pub fn planned_steps(&self) -> Result<Vec<PlannedStep>> {
        let mut out: Vec<PlannedStep> = Vec::new();
        for selection in &self.execution.chosen {
            let planned = self.registry.plan(selection, out.len())?;
            out.extend(planned);
        }
        Ok(out)
    }

    /// Steps that still need a configuration from the user: no explicit
    /// configuration and no feature defaults.
    pub fn pending_configuration(&self) -> Result<Vec<PlannedStep>> {
        Ok(self
            .planned_steps()?
            .into_iter()
            .filter(|p| {
                self.execution.configs.get(p.index).is_none()
                    && p.entry.default_configuration().is_none()
            })
            .collect())
    }

    /// Supply the configuration for flattened step `index`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when `index` is not a step of the selection.
    pub fn configure(&mut self, index: usize, config: Configuration) -> Result<()> {
        self.require_state(&[SessionState::AwaitingConfiguration], "configure")?;
        let steps = self.planned_steps()?;
        if !steps.iter().any(|p| p.index == index) {
            return Err(Error::Validation(format!(
                "no step {index} in the selection ({} step(s))",
                steps.len()
            )));
        }
        self.execution.configs.insert(index, config);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Compilation
    // -----------------------------------------------------------------------

    /// Compile the selection. On failure the session moves to `Failed` and
    /// the compilation error is returned; nothing is executed.
    pub fn submit(&mut self) -> Result<&CompiledPipeline> {
        self.require_state(&[SessionState::AwaitingConfiguration], "submit")?;
        self.execution.submitted = true;
        self.transition(SessionState::Compiling);

        match self
            .registry
            .compile_selection(&self.execution.chosen, &self.execution.configs)
        {
            Ok(pipeline) => {
                self.execution.progress_by_step = pipeline
                    .steps
                    .iter()
                    .map(|s| (s.index, StepStatus::Pending))
                    .collect();
                self.events
                    .broadcast(self.id, EventPayload::Compiled { steps: pipeline.len() });
                self.transition(SessionState::Ready);
                Ok(self.pipeline.insert(pipeline))
            }
            Err(e) => {
                tracing::warn!("Compilation failed: {e}");
                self.events
                    .broadcast(self.id, EventPayload::CompileFailed { error: e.to_string() });
                self.fail(&e);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run the compiled pipeline over `inputs`.
    ///
    /// Steps run strictly in order; each step's output is the next step's
    /// only input. The first engine failure moves the session to `Failed` and
    /// the remaining steps are not attempted. An abort moves it back to
    /// `Idle` and yields [`Error::Cancelled`].
    pub async fn run(&mut self, inputs: Vec<Artifact>) -> Result<ExecutionReport> {
        self.require_state(&[SessionState::Ready], "run")?;
        let Some(pipeline) = self.pipeline.clone() else {
            return Err(Error::Internal("ready session has no pipeline".into()));
        };

        let types: Vec<MediaType> = inputs.iter().map(|a| a.media_type).collect();
        if let Err(e) = pipeline.check_inputs(&types) {
            self.fail(&e);
            return Err(e);
        }

        let cancel = self.cancel.begin();
        self.transition(SessionState::Running);
        let result = self.run_steps(&pipeline, inputs, &cancel).await;
        self.cancel.finish();
        result
    }

    async fn run_steps(
        &mut self,
        pipeline: &CompiledPipeline,
        inputs: Vec<Artifact>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport> {
        let mut current = inputs;
        let mut reports = Vec::with_capacity(pipeline.len());
        for step in &pipeline.steps {
            let progress = step.progress();
            self.execution.current_step = Some(step.index);
            self.execution
                .progress_by_step
                .insert(step.index, StepStatus::Running);
            self.events.broadcast(
                self.id,
                EventPayload::StepStarted {
                    index: step.index,
                    feature: step.name().to_string(),
                    label: progress.label.clone(),
                    color: progress.color.clone(),
                },
            );
            tracing::info!("[{}/{}] {}", step.index + 1, pipeline.len(), progress.label);

            let request = StepRequest {
                session: self.id,
                index: step.index,
                feature: step.name(),
                command: step.command(),
                inputs: &current,
                output_type: step.output_type(),
            };
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.engine.run_command(request) => Some(result),
            };

            match outcome {
                None => {
                    tracing::info!("Run abandoned at step {}", step.index);
                    self.engine.abandon(self.id).await;
                    self.reset();
                    return Err(Error::Cancelled);
                }
                Some(Ok(output)) => {
                    let elapsed = started.elapsed();
                    self.execution
                        .progress_by_step
                        .insert(step.index, StepStatus::Done);
                    self.events.broadcast(
                        self.id,
                        EventPayload::StepCompleted {
                            index: step.index,
                            feature: step.name().to_string(),
                            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        },
                    );
                    tracing::info!("{} finished in {:.2}s", step.name(), elapsed.as_secs_f64());
                    reports.push(StepReport {
                        index: step.index,
                        feature: step.name().to_string(),
                        elapsed,
                    });
                    current = vec![output];
                }
                Some(Err(e)) => {
                    let err = match e {
                        e @ Error::EngineExecution { .. } => e,
                        other => Error::EngineExecution {
                            step: step.index,
                            feature: step.name().to_string(),
                            message: other.to_string(),
                        },
                    };
                    tracing::error!("{err}");
                    self.execution
                        .progress_by_step
                        .insert(step.index, StepStatus::Failed);
                    self.events.broadcast(
                        self.id,
                        EventPayload::StepFailed {
                            index: step.index,
                            feature: step.name().to_string(),
                            error: err.to_string(),
                        },
                    );
                    self.fail(&err);
                    return Err(err);
                }
            }
        }

        let Some(output) = current.pop() else {
            return Err(Error::Internal("pipeline produced no output".into()));
        };
        self.events
            .broadcast(self.id, EventPayload::Succeeded { steps: reports.len() });
        self.transition(SessionState::Succeeded);
        Ok(ExecutionReport {
            steps: reports,
            output,
        })
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Discard the selection, configurations, compiled pipeline and progress,
    /// abandoning in-flight work. Valid in every state; calling it twice is
    /// the same as calling it once.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.execution = ExecutionState::default();
        self.pipeline = None;
        self.last_error = None;
        self.events.broadcast(self.id, EventPayload::Reset);
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn require_state(&self, allowed: &[SessionState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::transition(self.state, action))
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = std::mem::replace(&mut self.state, to);
        tracing::info!("Session {}: {from} -> {to}", self.id);
        self.events.broadcast(
            self.id,
            EventPayload::StateChanged {
                from: from.to_string(),
                to: to.to_string(),
            },
        );
    }

    fn fail(&mut self, err: &Error) {
        self.last_error = Some(err.to_string());
        self.transition(SessionState::Failed);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}
