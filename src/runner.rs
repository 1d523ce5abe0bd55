//! Process runner: one child process per call, bounded by a deadline and
//! an optional cancellation token.
//!
//! The child is placed in its own process group so that timeout and
//! cancellation take down anything it spawned, not just the direct child.

use crate::backend::{CommandExecutor, CommandOutput, CommandSpec};
use crate::error::DeployError;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long to keep draining pipes after the child exited.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Real [`CommandExecutor`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `spec` to completion, timeout, or cancellation.
    pub async fn run(
        &self,
        spec: &CommandSpec,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        let tool = spec.tool_name();
        // Without a caller token the deadline is the only way out.
        let cancel = cancel.cloned().unwrap_or_default();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        debug!(
            command = %spec.command_line(),
            timeout_secs = spec.timeout.as_secs(),
            stream = spec.stream,
            "spawning"
        );

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DeployError::MissingBinary {
                binary: tool.clone(),
                hint: format!("could not spawn {}", spec.program.display()),
            },
            _ => DeployError::Process {
                tool: tool.clone(),
                message: format!("spawn failed: {}", e),
            },
        })?;

        // The leader is reaped before the pipes are drained; keep its id for
        // signalling whatever is left in its group.
        let pgid = child.id();
        let stream = spec.stream;
        let out = Capture::start(child.stdout.take(), stream.then(tokio::io::stdout));
        let err = Capture::start(child.stderr.take(), stream.then(tokio::io::stderr));

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = tokio::time::sleep(spec.timeout) => Outcome::TimedOut,
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        match outcome {
            Outcome::Exited(status) => {
                // Background descendants may still hold the pipes open.
                kill_group(pgid);
                let status = status.map_err(|e| DeployError::Process {
                    tool: tool.clone(),
                    message: format!("wait failed: {}", e),
                })?;
                let stdout = out.finish().await;
                let stderr = err.finish().await;
                debug!(tool = %tool, code = ?status.code(), "process exited");
                Ok(CommandOutput {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                })
            }
            Outcome::TimedOut => {
                warn!(tool = %tool, after_secs = spec.timeout.as_secs(), "deadline expired, killing process group");
                terminate(&mut child, pgid).await;
                out.abort();
                err.abort();
                Err(DeployError::Timeout {
                    tool,
                    after: spec.timeout,
                })
            }
            Outcome::Cancelled => {
                warn!(tool = %tool, "cancelled, killing process group");
                terminate(&mut child, pgid).await;
                out.abort();
                err.abort();
                Err(DeployError::Cancelled { tool })
            }
        }
    }
}

impl CommandExecutor for ProcessRunner {
    async fn execute(
        &self,
        spec: &CommandSpec,
        cancel: Option<&CancellationToken>,
    ) -> Result<CommandOutput, DeployError> {
        self.run(spec, cancel).await
    }
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// SIGKILL every process in the group led by `pgid`.
fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pgid {
        // SAFETY: killpg only sends a signal; the group id is the child's pid
        // because it was spawned with process_group(0).
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Kill the child's process group, then the child, and reap it.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    kill_group(pgid);
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill after killpg");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "reaping killed child");
    }
}

/// One child pipe being copied into a shared buffer.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R, W>(reader: Option<R>, sink: Option<W>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            if let Some(r) = reader {
                tee(r, sink, &shared).await;
            }
        });
        Self { buf, task }
    }

    /// Wait up to [`DRAIN_GRACE`] for EOF, then return whatever was read.
    async fn finish(mut self) -> String {
        match tokio::time::timeout(DRAIN_GRACE, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "capture task failed"),
            Err(_) => {
                debug!("pipe still open after exit, keeping output read so far");
                self.task.abort();
            }
        }
        self.contents()
    }

    fn abort(&self) {
        self.task.abort();
    }

    fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Copy `reader` into `captured`, mirroring to `sink` when present.
///
/// The first sink write error drops the sink; capture continues.
pub(crate) async fn tee<R, W>(mut reader: R, mut sink: Option<W>, captured: &Mutex<Vec<u8>>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "read error on child pipe");
                break;
            }
        };
        captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(&chunk[..n]);

        if let Some(w) = sink.as_mut() {
            let written = w.write_all(&chunk[..n]).await;
            let flushed = match written {
                Ok(()) => w.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = flushed {
                debug!(error = %e, "terminal not writable, capture only from here");
                sink = None;
            }
        }
    }
}
