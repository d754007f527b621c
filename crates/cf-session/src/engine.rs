//! The boundary with the external transcoding engine.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cf_core::{ArtifactId, MediaType, Result, SessionId};
use cf_feature::CompiledCommand;
use serde::{Deserialize, Serialize};

/// Handle to a media file flowing between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub media_type: MediaType,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, media_type: MediaType) -> Self {
        Self {
            id: ArtifactId::new(),
            path: path.into(),
            media_type,
        }
    }

    /// Classify by file extension; unknown extensions become
    /// [`MediaType::Other`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let media_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(MediaType::from_extension)
            .unwrap_or(MediaType::Other);
        Self::new(path, media_type)
    }
}

/// Everything the engine needs to run one step.
#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    /// The session running the step. Engines shared between sessions keep
    /// each session's intermediate files apart by this id.
    pub session: SessionId,
    /// Flattened step index.
    pub index: usize,
    /// Display name of the feature being run.
    pub feature: &'a str,
    pub command: &'a CompiledCommand,
    /// The intake artifacts for the first step, else the previous output.
    pub inputs: &'a [Artifact],
    /// Media type the step is declared to produce.
    pub output_type: MediaType,
}

/// An external transcoder.
///
/// `run_command` is the only place compiled commands are executed. The
/// session drops the returned future when a run is abandoned, so
/// implementations must release their resources on drop (e.g. spawn
/// processes with `kill_on_drop`). [`abandon`](Engine::abandon) is called
/// afterwards for any remaining cleanup of that session's files; other
/// sessions sharing the engine must not be affected.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run_command(&self, request: StepRequest<'_>) -> Result<Artifact>;

    async fn abandon(&self, _session: SessionId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_classifies_extension() {
        assert_eq!(Artifact::from_path("/in/clip.MOV").media_type, MediaType::Video);
        assert_eq!(Artifact::from_path("song.flac").media_type, MediaType::Audio);
        assert_eq!(Artifact::from_path("README").media_type, MediaType::Other);
    }

    #[test]
    fn artifacts_get_fresh_ids() {
        let a = Artifact::new("a.mp4", MediaType::Video);
        let b = Artifact::new("a.mp4", MediaType::Video);
        assert_ne!(a.id, b.id);
    }
}
