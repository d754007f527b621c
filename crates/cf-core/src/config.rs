//! clipforge settings.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! engine, catalog and session sections. Every section defaults sensibly so
//! a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Upper bound on encoder threads handed to the engine.
pub const MAX_THREADS: usize = 8;

/// Everything read from the `--config` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Strict parse; unknown keys are ignored, malformed JSON is an error.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Validation(format!("invalid config: {e}")))
    }

    /// Lenient load for startup. A missing or broken file is logged and the
    /// defaults are used instead.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = path.map(|p| (p, std::fs::read_to_string(p)));
        match loaded {
            None => Self::default(),
            Some((p, Ok(text))) => Self::from_json(&text).unwrap_or_else(|e| {
                tracing::warn!("{}: {e}; falling back to defaults", p.display());
                Self::default()
            }),
            Some((p, Err(e))) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    tracing::info!("{} does not exist; using defaults", p.display());
                } else {
                    tracing::warn!("Cannot read {}: {e}; using defaults", p.display());
                }
                Self::default()
            }
        }
    }

    /// Suspicious but usable settings, one message each.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match self.engine.threads {
            Some(0) => warnings.push("engine.threads is 0; using detected CPU count".into()),
            Some(n) if n > MAX_THREADS => warnings.push(format!(
                "engine.threads is {n}; it will be capped at {MAX_THREADS}"
            )),
            _ => {}
        }

        if self.engine.step_timeout_secs == 0 {
            warnings.push("engine.step_timeout_secs is 0; every step will time out".into());
        }

        if self.session.event_capacity == 0 {
            warnings.push("session.event_capacity is 0; using 1".into());
        }

        for (i, name) in self.catalog.hidden_features.iter().enumerate() {
            if name.trim().is_empty() {
                warnings.push(format!("catalog.hidden_features[{i}] is empty"));
            }
        }

        warnings
    }
}

/// Transcoding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Encoder threads; `None` uses the detected CPU count.
    pub threads: Option<usize>,
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
    /// Pass `-y` so existing outputs are overwritten.
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

fn default_step_timeout() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            threads: None,
            step_timeout_secs: default_step_timeout(),
            overwrite: true,
        }
    }
}

impl EngineConfig {
    /// Thread count handed to the encoder, capped at [`MAX_THREADS`].
    pub fn effective_threads(&self) -> usize {
        let requested = match self.threads {
            Some(n) if n > 0 => n,
            _ => num_cpus::get(),
        };
        requested.clamp(1, MAX_THREADS)
    }

    /// Per-step timeout as a [`Duration`].
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// Catalog filtering applied when the command registry is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Feature keys hidden from the `Features` category in addition to the
    /// catalog's own hidden entries.
    pub hidden_features: Vec<String>,
    /// Workflow names omitted from the `Workflows` category.
    pub disabled_workflows: Vec<String>,
}

/// Per-session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}
