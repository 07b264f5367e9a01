//! External process execution

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use generator_common::{Error, Result};

/// A command to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line as it would be typed in a shell
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion.
    ///
    /// Returns `Err` only when the process could not be started or did not
    /// finish within its timeout; a non-zero exit is reported through
    /// [`CommandOutput::status`].
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let start_time = Instant::now();
        let command_line = spec.display();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %command_line, "spawning process");
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::io(format!("Failed to spawn '{}': {}", command_line, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .map(|pipe| forward_lines(pipe, command_line.clone(), false));
        let mut stderr = child
            .stderr
            .take()
            .map(|pipe| forward_lines(pipe, command_line.clone(), true));

        // one deadline covers the exit and draining both pipes, which a
        // backgrounded grandchild may keep open after the child exits
        let finished = tokio::time::timeout(spec.timeout, async {
            let status = child.wait().await?;
            let stdout = collect(stdout.as_mut()).await;
            let stderr = collect(stderr.as_mut()).await;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        let output = match finished {
            Ok(Ok((status, stdout, stderr))) => CommandOutput {
                status: status.code(),
                stdout,
                stderr,
            },
            Ok(Err(e)) => {
                abort_readers([stdout, stderr]);
                return Err(e.into());
            }
            Err(_) => {
                abort_readers([stdout, stderr]);
                if matches!(child.try_wait(), Ok(None)) {
                    if let Err(e) = child.kill().await {
                        warn!(command = %command_line, error = %e, "failed to kill timed out process");
                    }
                }
                return Err(Error::generic(format!(
                    "'{}' timed out after {} seconds",
                    command_line,
                    spec.timeout.as_secs()
                )));
            }
        };

        debug!(
            command = %command_line,
            status = ?output.status,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "process finished"
        );

        Ok(output)
    }
}

/// Log each line of `pipe` as it arrives and return the full text
fn forward_lines<R>(pipe: R, command: String, is_stderr: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        let mut captured = Vec::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if is_stderr {
                        warn!(command = %command, "{}", line);
                    } else {
                        debug!(command = %command, "{}", line);
                    }
                    captured.push(line);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(command = %command, error = %e, "failed to read process output");
                    break;
                }
            }
        }
        captured.join("\n")
    })
}

async fn collect(handle: Option<&mut JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

fn abort_readers(readers: [Option<JoinHandle<String>>; 2]) {
    for reader in readers.into_iter().flatten() {
        reader.abort();
    }
}
