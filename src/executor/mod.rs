//! Command execution engine.
//!
//! Stateless apart from an immutable [`ExecutorConfig`]. Every public
//! operation returns a human-readable report and never fails outward: policy
//! rejections, timeouts, missing paths and IO errors are all rendered as text
//! for the calling agent.

mod decode;
mod listing;
mod policy;
mod process;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use decode::{Decoder, DecoderChain};
pub use policy::Denylist;

use process::{describe_exit, run_with_timeout, shell_command, ProcessOutcome};

/// Timeout applied when a request does not carry one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Every way an engine operation can fail before it produces a normal report.
///
/// `Display` is the text handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Error: directory '{0}' does not exist.")]
    MissingWorkingDirectory(String),

    #[error("Error: working directory '{0}' is not a directory.")]
    WorkingDirectoryNotADirectory(String),

    #[error("Command rejected for safety reasons (matched '{pattern}'): {command}")]
    Denied { command: String, pattern: String },

    #[error("Error: path '{0}' does not exist.")]
    PathNotFound(String),

    #[error("Error: '{0}' is not a directory.")]
    NotADirectory(String),

    #[error("Error while starting command: {0}")]
    Spawn(#[source] io::Error),

    #[error("Error while executing command: {0}")]
    Io(#[from] io::Error),
}

/// Fixed engine configuration, shared by every invocation.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub denylist: Denylist,
    pub decoders: DecoderChain,
    pub default_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            denylist: Denylist::with_defaults(),
            decoders: DecoderChain::default(),
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A single `execute_command` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub working_directory: Option<String>,
    /// Falls back to [`ExecutorConfig::default_timeout`] when `None`.
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_directory: None,
            timeout: None,
        }
    }

    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Exit code of a finished command. `TimedOut` is the sentinel for a killed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCode {
    Exited(String),
    TimedOut(Duration),
}

/// Fully decoded outcome of a command that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub command: String,
    pub working_directory: PathBuf,
    pub exit_code: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let ExitCode::TimedOut(timeout) = &self.exit_code {
            out.push_str(&format!(
                "Command timed out ({}s) and was terminated: {}\n",
                timeout.as_secs(),
                self.command
            ));
        }

        out.push_str(&format!("Command: {}\n", self.command));
        out.push_str(&format!(
            "Working directory: {}\n",
            self.working_directory.display()
        ));
        match &self.exit_code {
            ExitCode::Exited(code) => out.push_str(&format!("Exit code: {code}\n\n")),
            ExitCode::TimedOut(_) => {
                out.push_str("Exit code: timeout\n");
                return out;
            }
        }

        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        if !stdout.is_empty() {
            out.push_str(&format!("Output:\n{stdout}\n"));
        }
        if !stderr.is_empty() {
            out.push_str(&format!("Errors:\n{stderr}\n"));
        }
        if stdout.is_empty() && stderr.is_empty() {
            out.push_str("(no output)\n");
        }
        out
    }
}

/// Entry point for all engine operations. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: Arc<ExecutorConfig>,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `request` through the shell and return the rendered report.
    pub async fn execute_command(&self, request: CommandRequest) -> String {
        match self.run(&request).await {
            Ok(result) => result.render(),
            Err(e) => {
                log::debug!("execute_command failed: {e}");
                e.to_string()
            }
        }
    }

    /// Typed form of [`execute_command`](Self::execute_command).
    ///
    /// Validation and policy checks happen before anything is spawned.
    pub async fn run(&self, request: &CommandRequest) -> Result<ExecutionResult, ExecError> {
        let working_directory = resolve_working_directory(request.working_directory.as_deref())?;

        if let Some(pattern) = self.config.denylist.matched(&request.command) {
            log::warn!(
                "Rejected command matching denylist pattern '{pattern}': {}",
                request.command
            );
            return Err(ExecError::Denied {
                command: request.command.clone(),
                pattern: pattern.to_string(),
            });
        }

        let timeout = request.timeout.unwrap_or(self.config.default_timeout);
        log::info!(
            "Executing command in {} (timeout {}s): {}",
            working_directory.display(),
            timeout.as_secs(),
            request.command
        );

        let command = shell_command(&request.command, &working_directory);
        let outcome = run_with_timeout(command, timeout).await.map_err(|e| {
            log::error!("Failed to run '{}': {e}", request.command);
            ExecError::Spawn(e)
        })?;

        let result = match outcome {
            ProcessOutcome::Completed(output) => ExecutionResult {
                command: request.command.clone(),
                working_directory,
                exit_code: ExitCode::Exited(describe_exit(&output.status)),
                stdout: self.config.decoders.decode(&output.stdout),
                stderr: self.config.decoders.decode(&output.stderr),
            },
            ProcessOutcome::TimedOut => {
                log::warn!(
                    "Command exceeded {}s and was killed: {}",
                    timeout.as_secs(),
                    request.command
                );
                ExecutionResult {
                    command: request.command.clone(),
                    working_directory,
                    exit_code: ExitCode::TimedOut(timeout),
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
        };
        Ok(result)
    }

    /// List the direct children of `path`.
    pub async fn list_directory(&self, path: &str) -> String {
        match listing::read_listing(path).await {
            Ok(listing) => listing.render(),
            Err(ExecError::Io(e)) => format!("Error while listing directory: {e}"),
            Err(e) => e.to_string(),
        }
    }

    pub fn get_current_directory(&self) -> String {
        match std::env::current_dir() {
            Ok(dir) => format!("Current working directory: {}", dir.display()),
            Err(e) => format!("Error while reading current directory: {e}"),
        }
    }
}

/// Blank `requested` counts as absent and resolves to the process directory.
fn resolve_working_directory(requested: Option<&str>) -> Result<PathBuf, ExecError> {
    let Some(dir) = requested.filter(|dir| !dir.trim().is_empty()) else {
        return Ok(std::env::current_dir()?);
    };

    let path = PathBuf::from(dir);
    match std::fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(path),
        Ok(_) => Err(ExecError::WorkingDirectoryNotADirectory(dir.to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ExecError::MissingWorkingDirectory(dir.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
