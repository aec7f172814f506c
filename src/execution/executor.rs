//! Subprocess spawning and output streaming.

use std::process::Stdio;
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::command::Command;
use super::result::{drain_utf8, OutputChunk, OutputSource, ProcessExit};
use crate::error::ShellSocketError;
use crate::Result;

/// Buffer size for reading process output.
const READ_BUFFER_SIZE: usize = 4096;

/// How long output readers may keep going once the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Output still read after the drain deadline, about one pipe buffer.
const DRAIN_TAIL: usize = 64 * 1024;

/// Capacity of a session's event channel. Readers wait when it is full.
pub const EVENT_BUFFER: usize = 64;

/// Event emitted by a running process.
#[derive(Debug)]
pub enum ExecEvent {
    /// A chunk of output from either stream.
    Output(OutputChunk),
    /// The process is gone and its output is drained. Always last.
    Exited(ProcessExit),
}

/// Spawns command lines through a shell program.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    program: String,
    flag: String,
}

impl ShellExecutor {
    /// Run commands as `<program> <flag> <command line>`.
    pub fn new(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }

    /// `sh -c` on Unix, `cmd /C` on Windows.
    pub fn system_default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }

    /// Shell program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start `command` and stream its events into `events`.
    ///
    /// Returns once the process is running; output and the final exit
    /// event arrive asynchronously. Fails only if the shell itself
    /// cannot be started.
    pub fn spawn(
        &self,
        command: &Command,
        events: mpsc::Sender<ExecEvent>,
    ) -> Result<ProcessHandle> {
        let mut std_cmd = std::process::Command::new(&self.program);
        std_cmd
            .arg(&self.flag)
            .arg(&command.command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            std_cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            // Own process group, so an interrupt reaches the whole pipeline.
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = tokio::process::Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ShellSocketError::Spawn(e.to_string()))?;
        let pid = child.id();
        info!(pid, command = %command.command_line, "process spawned");

        let stdin = child.stdin.take().map(spawn_stdin_writer);

        let drained = CancellationToken::new();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_output(
                stdout,
                OutputSource::Stdout,
                events.clone(),
                drained.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_output(
                stderr,
                OutputSource::Stderr,
                events.clone(),
                drained.clone(),
            )));
        }

        let interrupt = CancellationToken::new();
        tokio::spawn(supervise(child, readers, drained, interrupt.clone(), events));

        Ok(ProcessHandle {
            pid,
            stdin,
            interrupt,
        })
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Control handle for a spawned process.
///
/// Dropping the handle interrupts the process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    stdin: Option<mpsc::UnboundedSender<Vec<u8>>>,
    interrupt: CancellationToken,
}

impl ProcessHandle {
    /// OS process id, if known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Queue bytes for the process's standard input.
    ///
    /// Returns `false` once the input side is closed.
    pub fn write(&self, data: &[u8]) -> bool {
        self.stdin
            .as_ref()
            .map(|tx| tx.send(data.to_vec()).is_ok())
            .unwrap_or(false)
    }

    /// Send a single termination signal. No escalation follows.
    pub fn interrupt(&self) {
        self.interrupt.cancel();
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.interrupt.cancel();
    }
}

/// Feed queued input to the child in order.
fn spawn_stdin_writer(mut stdin: ChildStdin) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if let Err(e) = stdin.write_all(&data).await {
                debug!("stdin writer: {}", e);
                break;
            }
            if stdin.flush().await.is_err() {
                break;
            }
        }
        trace!("stdin writer finished");
    });
    tx
}

/// Stream one pipe into `events` until EOF or until `drained` fires.
///
/// Sending waits for room in the channel, so a slow consumer stalls the
/// reader and, through the pipe, the process itself.
async fn forward_output<R>(
    mut reader: R,
    source: OutputSource,
    events: mpsc::Sender<ExecEvent>,
    drained: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    let mut tail = DRAIN_TAIL;

    loop {
        // Buffered output wins over the deadline; it only ends an idle read.
        let read = tokio::select! {
            biased;
            read = reader.read(&mut buf) => read,
            _ = drained.cancelled() => break,
        };
        match read {
            Ok(0) => break,
            Ok(n) => {
                trace!(?source, "read {} bytes", n);
                pending.extend_from_slice(&buf[..n]);
                let text = drain_utf8(&mut pending);
                if text.is_empty() {
                    continue;
                }
                if events
                    .send(ExecEvent::Output(OutputChunk::new(text, source)))
                    .await
                    .is_err()
                {
                    return;
                }
                if drained.is_cancelled() {
                    // Stop a grandchild that keeps writing after the exit.
                    tail = tail.saturating_sub(n);
                    if tail == 0 {
                        break;
                    }
                }
            }
            Err(e) => {
                debug!(?source, "output reader error: {}", e);
                break;
            }
        }
    }

    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        let _ = events
            .send(ExecEvent::Output(OutputChunk::new(text, source)))
            .await;
    }
}

/// Wait for exit (or interrupt), drain the readers, then report.
async fn supervise(
    mut child: Child,
    mut readers: Vec<JoinHandle<()>>,
    drained: CancellationToken,
    interrupt: CancellationToken,
    events: mpsc::Sender<ExecEvent>,
) {
    let start = Instant::now();
    let pid = child.id();
    let mut interrupted = false;

    let status = tokio::select! {
        status = child.wait() => status,
        _ = interrupt.cancelled() => {
            interrupted = true;
            debug!(pid, "interrupting process");
            if let Err(e) = terminate(&mut child) {
                warn!(pid, "failed to signal process: {}", e);
            }
            child.wait().await
        }
    };

    let drain = async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        // A detached grandchild still holds the pipe open, or the consumer
        // is slow. Readers deliver what is buffered and then stop.
        debug!(pid, "output reader outlived the process");
        drained.cancel();
        readers.retain(|reader| !reader.is_finished());
        for reader in readers {
            let _ = reader.await;
        }
    }

    let exit_code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(pid, "failed to wait for process: {}", e);
            None
        }
    };
    info!(pid, code = ?exit_code, "child process exited");

    let _ = events
        .send(ExecEvent::Exited(ProcessExit {
            exit_code,
            duration: start.elapsed(),
            interrupted,
        }))
        .await;
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    // The child leads the process group created at spawn.
    killpg(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
