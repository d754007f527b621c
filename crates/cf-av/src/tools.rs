//! Locating ffmpeg and ffprobe.
//!
//! A path from [`EngineConfig`] wins when it exists; otherwise `PATH` is
//! searched.

use std::path::{Path, PathBuf};

use cf_core::config::EngineConfig;
use cf_core::{Error, Result};
use serde::Serialize;

/// Availability report for one tool, as printed by `check-tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolved tool locations. Only ffmpeg is needed to run pipelines.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
}

impl ToolRegistry {
    pub fn discover(config: &EngineConfig) -> Self {
        Self {
            ffmpeg: locate("ffmpeg", config.ffmpeg_path.as_deref()),
            ffprobe: locate("ffprobe", config.ffprobe_path.as_deref()),
        }
    }

    /// Use `path` for ffmpeg without checking that it exists.
    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = Some(path.into());
        self
    }

    /// # Errors
    ///
    /// [`Error::Tool`] when ffmpeg was not found.
    pub fn ffmpeg(&self) -> Result<&Path> {
        self.ffmpeg
            .as_deref()
            .ok_or_else(|| Error::tool("ffmpeg", "ffmpeg not found; install it or set engine.ffmpeg_path"))
    }

    pub fn ffprobe(&self) -> Option<&Path> {
        self.ffprobe.as_deref()
    }

    /// Report on every tool, running `-version` on the ones that were found.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        [("ffmpeg", &self.ffmpeg), ("ffprobe", &self.ffprobe)]
            .into_iter()
            .map(|(name, path)| ToolInfo {
                name,
                available: path.is_some(),
                version: path.as_deref().and_then(version_line),
                path: path.clone(),
            })
            .collect()
    }
}

fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    match configured {
        Some(path) if path.exists() => return Some(path.to_path_buf()),
        Some(path) => {
            tracing::warn!("Configured {name} at {} does not exist; searching PATH", path.display());
        }
        None => {}
    }
    match which::which(name) {
        Ok(path) => {
            tracing::debug!("Found {name} at {}", path.display());
            Some(path)
        }
        Err(_) => {
            tracing::debug!("{name} not found on PATH");
            None
        }
    }
}

fn version_line(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_never_panics() {
        let _ = ToolRegistry::discover(&EngineConfig::default()).check_all();
    }

    #[test]
    fn missing_ffmpeg_is_tool_error() {
        let err = ToolRegistry::default().ffmpeg().unwrap_err();
        assert!(matches!(err, Error::Tool { ref tool, .. } if tool == "ffmpeg"));
    }

    #[test]
    fn check_all_lists_both_tools() {
        let infos = ToolRegistry::default().check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name).collect();
        assert_eq!(names, ["ffmpeg", "ffprobe"]);
        assert!(infos.iter().all(|i| !i.available && i.version.is_none()));
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("ffmpeg");
        std::fs::write(&fake, b"").unwrap();
        let config = EngineConfig {
            ffmpeg_path: Some(fake.clone()),
            ..EngineConfig::default()
        };
        let tools = ToolRegistry::discover(&config);
        assert_eq!(tools.ffmpeg().unwrap(), fake);
    }

    #[test]
    fn explicit_ffmpeg() {
        let tools = ToolRegistry::default().with_ffmpeg("/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(tools.ffmpeg().unwrap(), Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert!(tools.check_all()[0].available);
    }
}
