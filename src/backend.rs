//! The One Trait: CommandExecutor
//!
//! Every external effect this crate has goes through a child process:
//! `site-builder` for publishing, `walrus` for pricing and reachability,
//! `sui` for wallet balances. The workflow engine is pure logic over
//! this trait; [`ProcessRunner`](crate::runner::ProcessRunner) is the
//! real implementation, tests plug in recorders.

use crate::error::DeployError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ceiling applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// One external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Duplicate live output to the terminal while capturing.
    pub stream: bool,
    pub timeout: Duration,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stream: false,
            timeout: DEFAULT_TIMEOUT,
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Short tool name for messages (`site-builder`, `walrus`, ...).
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// The full command line, for copy-paste debugging.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("'{}'", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

/// Captured result of a process that ran to exit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr; the deployer reports on both.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Exit description for error messages.
    pub fn exit_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands.
///
/// Implementations spawn exactly one process per call and never retry.
/// A non-zero exit is reported through [`CommandOutput::exit_code`], not
/// as an `Err`; errors are reserved for spawn failures, timeouts and
/// cancellation so callers can classify the captured streams.
pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        spec: &CommandSpec,
        cancel: Option<&CancellationToken>,
    ) -> impl Future<Output = Result<CommandOutput, DeployError>> + Send;
}
