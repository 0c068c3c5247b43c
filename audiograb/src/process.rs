//! External process invocation with a wall-clock deadline and an output ceiling.
//!
//! Commands are always spawned directly with a discrete argument vector, never
//! through a shell, so nothing in a request can be interpreted as shell syntax.
//!
//! On unix each command leads its own process group. A timeout, an oversized
//! output or a dropped future kills the whole group, so helpers the tool
//! started (yt-dlp running ffmpeg, for instance) die with it.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Maximum number of stderr characters carried in a [`Error::ProcessFailed`].
const MAX_STDERR_CHARS: usize = 1000;

/// Stderr kept in memory per process; the rest is drained and discarded.
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// A single external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
    pub timeout: Duration,
    /// Upper bound on captured stdout, in bytes. `None` means unbounded.
    pub max_output_bytes: Option<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            max_output_bytes: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = Some(limit);
        self
    }

    /// Whether `flag` appears verbatim in the argument vector.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// The argument following `flag`, if any.
    pub fn arg_after(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
    }
}

/// Captured output of a process that exited successfully.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs external commands.
///
/// Implementations must return `Err` for timeouts, oversized output and
/// non-zero exits; `Ok` always means the process exited with status 0.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput>;
}

/// Process runner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        let start = Instant::now();
        let program = spec.program.as_str();

        let mut command = Command::new(program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    program: program.to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        let pid = child.id();
        let mut group = ProcessGroup::new(pid);
        debug!(program, pid, "spawned process");

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let collect = async {
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout_pipe, spec.max_output_bytes, program),
                read_truncated(stderr_pipe, MAX_STDERR_BYTES),
            )?;
            let status = child.wait().await?;
            Ok::<_, Error>((stdout, stderr, status))
        };

        let outcome = tokio::time::timeout(spec.timeout, collect).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (stdout, stderr, status) = match outcome {
            Ok(Ok(collected)) => {
                group.disarm();
                collected
            }
            Ok(Err(e)) => {
                group.kill();
                let _ = child.kill().await;
                warn!(program, elapsed_ms, error = %e, "process aborted");
                return Err(e);
            }
            Err(_) => {
                group.kill();
                let _ = child.kill().await;
                warn!(
                    program,
                    elapsed_ms,
                    timeout_ms = u64::try_from(spec.timeout.as_millis()).unwrap_or(u64::MAX),
                    "process timed out, killed"
                );
                return Err(Error::ProcessTimeout {
                    program: program.to_string(),
                    timeout: spec.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            debug!(program, code = ?status.code(), elapsed_ms, "process failed");
            return Err(Error::ProcessFailed {
                program: program.to_string(),
                code: status.code(),
                stderr: truncate_stderr(&stderr),
            });
        }

        debug!(program, elapsed_ms, stdout_bytes = stdout.len(), "process completed");

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or_default(),
        })
    }
}

/// Read a pipe to the end, failing once more than `limit` bytes arrive.
async fn read_capped<R>(pipe: Option<R>, limit: Option<usize>, program: &str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    match limit {
        Some(limit) => {
            let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
            pipe.take(cap).read_to_end(&mut buf).await?;
            if buf.len() > limit {
                return Err(Error::OutputTooLarge {
                    program: program.to_string(),
                    limit,
                });
            }
        }
        None => {
            let mut pipe = pipe;
            pipe.read_to_end(&mut buf).await?;
        }
    }
    Ok(buf)
}

/// Read up to `limit` bytes, then drain the rest so the writer never blocks.
async fn read_truncated<R>(pipe: Option<R>, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX);
    (&mut pipe).take(cap).read_to_end(&mut buf).await?;
    tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok(buf)
}

/// Kills a child's process group unless disarmed, at the latest on drop.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// The child exited on its own; leave its group alone.
    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: i32) {
    // SAFETY: killpg takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: i32) {}

/// Trim and limit stderr so error messages stay readable.
fn truncate_stderr(stderr: &str) -> String {
    stderr.trim().chars().take(MAX_STDERR_CHARS).collect()
}
