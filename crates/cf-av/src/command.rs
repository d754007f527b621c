//! Async runner for one external tool invocation.

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use cf_core::{Error, Result};
use tokio::process::Command;

/// Default limit for a single invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// How many trailing stderr lines are quoted when a tool fails. ffmpeg
/// prints the actual reason last.
const STDERR_TAIL: usize = 3;

/// What a finished invocation left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// A program plus its arguments, run with a deadline.
///
/// The child is spawned with `kill_on_drop`, so dropping the future returned
/// by [`run`](ToolCommand::run) terminates the process. That is how an
/// abandoned session stops an in-flight transcode.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Arguments after the program name.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    fn tool_name(&self) -> String {
        match self.program.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.program.display().to_string(),
        }
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// [`Error::Tool`] when the program cannot be spawned, runs past the
    /// deadline, or exits unsuccessfully. The last lines of stderr are
    /// included in the message.
    pub async fn run(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();
        tracing::debug!("Running {self}");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| Error::tool(&tool, format!("wait failed: {e}")))?,
            Err(_) => {
                return Err(Error::tool(
                    &tool,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))
            }
        };

        let output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: started.elapsed(),
        };
        if !output.status.success() {
            return Err(Error::tool(
                tool,
                format!("{}: {}", output.status, stderr_tail(&output.stderr)),
            ));
        }
        Ok(output)
    }
}

/// Renders a copy-pasteable command line.
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines[lines.len().saturating_sub(STDERR_TAIL)..].join(" | ")
}
