//! Scratch space for intermediate step outputs.
//!
//! A [`Workspace`] owns a temporary directory with one subdirectory per
//! session. Every step writes its output into its session's directory; only
//! the final artifact is exported to the user's destination. Dropping the
//! workspace removes everything left in it.

use std::path::{Path, PathBuf};

use cf_core::{Error, Result, SessionId};
use tempfile::TempDir;

#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new workspace in the system temp directory.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("clipforge-")
            .tempdir()
            .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory holding `session`'s intermediate files.
    pub fn session_dir(&self, session: SessionId) -> PathBuf {
        self.temp_dir.path().join(session.to_string())
    }

    /// Output path for flattened step `index` of `session`. Creates the
    /// session directory on first use.
    pub fn step_output(&self, session: SessionId, index: usize, extension: &str) -> Result<PathBuf> {
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("step-{index:02}.{extension}")))
    }

    /// Remove `session`'s directory and return how many files it held.
    /// Other sessions' files are untouched.
    pub fn clear(&self, session: SessionId) -> Result<usize> {
        let dir = self.session_dir(session);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            if entry?.path().is_file() {
                removed += 1;
            }
        }
        std::fs::remove_dir_all(&dir)?;
        Ok(removed)
    }

    /// Copy (or move, when on the same filesystem) `artifact` to `dest`.
    ///
    /// With `backup_ext`, an existing `dest` is first renamed to
    /// `<dest>.<ext>`. Returns `dest`.
    pub fn export(&self, artifact: &Path, dest: &Path, backup_ext: Option<&str>) -> Result<PathBuf> {
        if !artifact.exists() {
            return Err(Error::tool(
                "workspace",
                format!("output file does not exist: {}", artifact.display()),
            ));
        }

        if let Some(ext) = backup_ext {
            if dest.exists() {
                let backup = dest.with_extension(ext);
                std::fs::rename(dest, &backup).map_err(|e| {
                    Error::tool("workspace", format!("failed to create backup: {e}"))
                })?;
            }
        }

        // Rename first (same filesystem), fall back to copy.
        if std::fs::rename(artifact, dest).is_err() {
            std::fs::copy(artifact, dest).map_err(|e| {
                Error::tool(
                    "workspace",
                    format!("failed to copy output to destination: {e}"),
                )
            })?;
        }

        Ok(dest.to_path_buf())
    }
}
