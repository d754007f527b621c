//! [`Engine`] implementation that runs one ffmpeg process per step.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cf_core::config::EngineConfig;
use cf_core::{Error, MediaType, Result, SessionId};
use cf_session::{Artifact, Engine, StepRequest};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// Runs compiled steps through ffmpeg, writing intermediates to a private
/// [`Workspace`].
#[derive(Debug)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    threads: usize,
    timeout: Duration,
    overwrite: bool,
    workspace: Workspace,
}

impl FfmpegEngine {
    /// # Errors
    ///
    /// [`Error::Tool`] if ffmpeg was not discovered or the workspace cannot
    /// be created.
    pub fn new(tools: &ToolRegistry, config: &EngineConfig) -> Result<Self> {
        let ffmpeg = tools.ffmpeg()?.to_path_buf();
        Ok(Self {
            ffmpeg,
            threads: config.effective_threads(),
            timeout: config.step_timeout(),
            overwrite: config.overwrite,
            workspace: Workspace::new()?,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The full ffmpeg invocation for `request`, writing to `output`.
    pub fn build_command(&self, request: &StepRequest<'_>, output: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.timeout)
            .args(["-hide_banner", "-nostdin"])
            .arg(if self.overwrite { "-y" } else { "-n" });
        for input in request.inputs {
            cmd.arg("-i").arg(input.path.to_string_lossy());
        }
        cmd.args(request.command.args().iter().cloned())
            .args(["-threads".to_string(), self.threads.to_string()])
            .arg(output.to_string_lossy());
        cmd
    }

    /// Output extension: the container chosen by the command, else the
    /// extension of the first input when it matches the output type, else a
    /// default for the output type.
    fn output_extension(request: &StepRequest<'_>) -> String {
        if let Some(container) = request.command.container() {
            return container.extension().to_string();
        }
        let inherited = request
            .inputs
            .first()
            .filter(|a| a.media_type == request.output_type)
            .and_then(|a| a.path.extension())
            .and_then(|e| e.to_str());
        match inherited {
            Some(ext) => ext.to_ascii_lowercase(),
            None => default_extension(request.output_type).to_string(),
        }
    }
}

fn default_extension(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Video => "mp4",
        MediaType::Audio => "m4a",
        MediaType::Image => "png",
        MediaType::Other => "bin",
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn run_command(&self, request: StepRequest<'_>) -> Result<Artifact> {
        let output = self.workspace.step_output(
            request.session,
            request.index,
            &Self::output_extension(&request),
        )?;
        let cmd = self.build_command(&request, &output);
        cmd.run().await.map_err(|e| Error::EngineExecution {
            step: request.index,
            feature: request.feature.to_string(),
            message: e.to_string(),
        })?;

        Ok(Artifact::new(output, request.output_type))
    }

    async fn abandon(&self, session: SessionId) {
        match self.workspace.clear(session) {
            Ok(n) => tracing::info!("Discarded {n} intermediate file(s) of {}", session.short()),
            Err(e) => tracing::warn!("Failed to clean workspace: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::Container;
    use cf_feature::CompiledCommand;

    fn engine(overwrite: bool) -> FfmpegEngine {
        let tools = ToolRegistry::default().with_ffmpeg("/usr/bin/ffmpeg");
        let config = EngineConfig {
            threads: Some(64),
            overwrite,
            ..EngineConfig::default()
        };
        FfmpegEngine::new(&tools, &config).unwrap()
    }

    fn request<'a>(command: &'a CompiledCommand, inputs: &'a [Artifact]) -> StepRequest<'a> {
        StepRequest {
            session: SessionId::new(),
            index: 1,
            feature: "Grayscale",
            command,
            inputs,
            output_type: MediaType::Video,
        }
    }

    #[test]
    fn builds_full_invocation() {
        let engine = engine(true);
        let command = CompiledCommand::new(["-vf", "hue=s=0"]);
        let inputs = [Artifact::new("/in/clip.mov", MediaType::Video)];
        let req = request(&command, &inputs);
        let out = engine
            .workspace()
            .step_output(req.session, 1, &FfmpegEngine::output_extension(&req))
            .unwrap();
        let cmd = engine.build_command(&req, &out);

        let args = cmd.argv();
        assert_eq!(&args[..6], ["-hide_banner", "-nostdin", "-y", "-i", "/in/clip.mov", "-vf"]);
        assert_eq!(args[6], "hue=s=0");
        assert_eq!(&args[7..9], ["-threads", "8"]);
        assert!(args[9].ends_with("step-01.mov"));
    }

    #[test]
    fn no_overwrite_uses_dash_n() {
        let engine = engine(false);
        let command = CompiledCommand::new(["-an"]);
        let inputs = [Artifact::new("/in/a.mp4", MediaType::Video)];
        let cmd = engine.build_command(&request(&command, &inputs), Path::new("/tmp/o.mp4"));
        assert_eq!(cmd.argv()[2], "-n");
    }

    #[test]
    fn container_overrides_extension() {
        let command = CompiledCommand::new(["-f", "matroska"]).with_container(Container::Mkv);
        let inputs = [Artifact::new("/in/clip.mp4", MediaType::Video)];
        assert_eq!(FfmpegEngine::output_extension(&request(&command, &inputs)), "mkv");
    }

    #[test]
    fn type_change_uses_default_extension() {
        let command = CompiledCommand::new(["-vn"]);
        let inputs = [Artifact::new("/in/clip.mp4", MediaType::Video)];
        let req = StepRequest {
            output_type: MediaType::Audio,
            ..request(&command, &inputs)
        };
        assert_eq!(FfmpegEngine::output_extension(&req), "m4a");
    }

    #[test]
    fn missing_ffmpeg_is_tool_error() {
        let err = FfmpegEngine::new(&ToolRegistry::default(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[tokio::test]
    async fn failed_process_maps_to_engine_error() {
        let tools = ToolRegistry::default().with_ffmpeg("/nonexistent/ffmpeg");
        let engine = FfmpegEngine::new(&tools, &EngineConfig::default()).unwrap();
        let command = CompiledCommand::new(["-an"]);
        let inputs = [Artifact::new("/in/a.mp4", MediaType::Video)];
        let err = engine.run_command(request(&command, &inputs)).await.unwrap_err();
        assert!(matches!(err, Error::EngineExecution { step: 1, .. }));
    }

    #[tokio::test]
    async fn abandon_only_clears_its_session() {
        let engine = engine(true);
        let (a, b) = (SessionId::new(), SessionId::new());
        let a_out = engine.workspace().step_output(a, 0, "mp4").unwrap();
        let b_out = engine.workspace().step_output(b, 0, "mp4").unwrap();
        std::fs::write(&a_out, b"a").unwrap();
        std::fs::write(&b_out, b"b").unwrap();

        engine.abandon(a).await;
        assert!(!a_out.exists());
        assert!(b_out.exists());
    }
}
