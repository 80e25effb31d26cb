// src/exec/runner.rs

//! Shell process runner.
//!
//! One invocation = one shell process. Both pipes are read in raw chunks by
//! background Tokio tasks that forward into a single channel; the runner
//! drains that channel, so the chunk callback is only ever invoked from one
//! place and never concurrently with itself.

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::exec::backend::{ChunkSink, CommandExecutor, Invocation};
use crate::exec::decode::Utf8Stream;
use crate::exec::shell::Shell;
use crate::types::{ExecutionResult, OutputChunk, StreamKind};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Runs commands through a [`Shell`].
///
/// Cloning is cheap; clones share the same cancellation token, so cancelling
/// one cancels every run started from any of them.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    shell: Shell,
    cancel: CancellationToken,
}

impl ShellRunner {
    pub fn new(shell: Shell) -> Self {
        Self {
            shell,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Kill whatever is currently running and refuse new runs.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run a command from within an existing Tokio runtime.
    pub async fn run<F>(
        &self,
        invocation: &Invocation,
        mut on_chunk: F,
    ) -> Result<ExecutionResult, TaskError>
    where
        F: FnMut(&OutputChunk) + Send,
    {
        self.execute_async(invocation, &self.cancel, &mut on_chunk)
            .await
    }

    /// Run a command, blocking the calling thread until it exits.
    pub fn run_sync<F>(
        &self,
        invocation: &Invocation,
        on_chunk: F,
    ) -> Result<ExecutionResult, TaskError>
    where
        F: FnMut(&OutputChunk) + Send,
    {
        block_on(self.run(invocation, on_chunk))?
    }

    /// Run a command on a dedicated thread and return immediately.
    ///
    /// `on_chunk` and `on_complete` are both called on that thread, one after
    /// the other. Fails only if the worker thread cannot be created, in which
    /// case `on_complete` is never called.
    pub fn run_async<F, C>(
        &self,
        invocation: Invocation,
        mut on_chunk: F,
        on_complete: C,
    ) -> Result<AsyncRun, TaskError>
    where
        F: FnMut(&OutputChunk) + Send + 'static,
        C: FnOnce(Result<ExecutionResult, TaskError>) + Send + 'static,
    {
        let runner = self.clone();
        let cancel = self.cancel.child_token();
        let run_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("taskchain-exec".to_string())
            .spawn(move || {
                let result = current_thread_runtime().and_then(|rt| {
                    rt.block_on(runner.execute_async(&invocation, &run_cancel, &mut on_chunk))
                });
                on_complete(result);
            })
            .map_err(|e| TaskError::io("spawning executor thread", &e))?;

        Ok(AsyncRun { handle, cancel })
    }

    /// Full path of `name` as resolved by the shell, if it names a program.
    pub fn path_for_command(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+' | '/'));
        if !plain {
            debug!(name, "refusing to look up command with shell metacharacters");
            return None;
        }

        let invocation = Invocation::new(format!("command -v {name}"));
        match self.run_sync(&invocation, |_| {}) {
            Ok(result) if result.success() => result
                .stdout
                .lines()
                .map(str::trim)
                .find(|line| line.starts_with('/'))
                .map(PathBuf::from),
            Ok(_) => None,
            Err(err) => {
                debug!(name, error = %err, "command lookup failed");
                None
            }
        }
    }

    pub fn command_is_available(&self, name: &str) -> bool {
        self.path_for_command(name).is_some()
    }

    async fn execute_async(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<ExecutionResult, TaskError> {
        let command = invocation.resolved_command().into_owned();
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled { command });
        }

        let shell_name = self.shell.program().display().to_string();
        info!(shell = %shell_name, cmd = %command, "starting process");

        let mut cmd = self.shell.command(&command);
        let stdin = if invocation.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        cmd.stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            warn!(shell = %shell_name, error = %e, "failed to spawn shell");
            TaskError::spawn(shell_name.clone(), &e)
        })?;

        if let (Some(input), Some(stdin)) = (invocation.input.clone(), child.stdin.take()) {
            tokio::spawn(feed_stdin(stdin, input));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<(StreamKind, Vec<u8>)>();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_pipe(stdout, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_pipe(stderr, StreamKind::Stderr, tx.clone()));
        }
        drop(tx);

        // A timeout too far out to represent is no deadline at all.
        let deadline = invocation
            .timeout
            .and_then(|t| Instant::now().checked_add(t));
        let mut collector = Collector::default();

        // The channel closes once both pipes hit EOF.
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some((stream, bytes)) => collector.accept(stream, &bytes, on_chunk),
                    None => break,
                },
                reason = interrupted(cancel, deadline) => {
                    return Err(abort(&mut child, reason, command, invocation.timeout).await);
                }
            }
        }
        collector.finish(on_chunk);

        let status = tokio::select! {
            status = child.wait() => status
                .map_err(|e| TaskError::io(format!("waiting for '{command}'"), &e))?,
            reason = interrupted(cancel, deadline) => {
                return Err(abort(&mut child, reason, command, invocation.timeout).await);
            }
        };

        let code = exit_code(status);
        info!(
            cmd = %command,
            exit_code = code,
            success = status.success(),
            "process exited"
        );

        let mut result = collector.result;
        result.exit_status = code;
        Ok(result)
    }
}

impl CommandExecutor for ShellRunner {
    fn execute(
        &self,
        invocation: &Invocation,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<ExecutionResult, TaskError> {
        block_on(self.execute_async(invocation, &self.cancel, on_chunk))?
    }
}

/// Handle to a command started with [`ShellRunner::run_async`].
#[derive(Debug)]
pub struct AsyncRun {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl AsyncRun {
    /// Kill this run only; other runs of the same runner are unaffected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker thread, which returns after `on_complete` ran.
    pub fn join(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

/// Decodes and accumulates both streams for one invocation.
#[derive(Default)]
struct Collector {
    stdout: Utf8Stream,
    stderr: Utf8Stream,
    result: ExecutionResult,
}

impl Collector {
    fn accept(&mut self, stream: StreamKind, bytes: &[u8], on_chunk: &mut ChunkSink<'_>) {
        let text = match stream {
            StreamKind::Stdout => self.stdout.push(bytes),
            StreamKind::Stderr => self.stderr.push(bytes),
        };
        self.emit(OutputChunk { text, stream }, on_chunk);
    }

    fn finish(&mut self, on_chunk: &mut ChunkSink<'_>) {
        let out = self.stdout.finish();
        self.emit(OutputChunk::stdout(out), on_chunk);
        let err = self.stderr.finish();
        self.emit(OutputChunk::stderr(err), on_chunk);
    }

    fn emit(&mut self, chunk: OutputChunk, on_chunk: &mut ChunkSink<'_>) {
        if chunk.text.is_empty() {
            return;
        }
        debug!(stream = %chunk.stream, bytes = chunk.text.len(), "output chunk");
        self.result.push_chunk(&chunk);
        on_chunk(&chunk);
    }
}

#[derive(Debug, Clone, Copy)]
enum Interrupt {
    Cancelled,
    TimedOut,
}

async fn interrupted(cancel: &CancellationToken, deadline: Option<Instant>) -> Interrupt {
    let timer = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => Interrupt::Cancelled,
        _ = timer => Interrupt::TimedOut,
    }
}

async fn abort(
    child: &mut Child,
    reason: Interrupt,
    command: String,
    timeout: Option<Duration>,
) -> TaskError {
    info!(cmd = %command, ?reason, "killing process");
    if let Err(e) = child.kill().await {
        warn!(cmd = %command, error = %e, "failed to kill child process");
    }

    match reason {
        Interrupt::Cancelled => TaskError::Cancelled { command },
        Interrupt::TimedOut => TaskError::TimedOut {
            command,
            after: timeout.unwrap_or_default(),
        },
    }
}

async fn read_pipe<R>(mut pipe: R, stream: StreamKind, tx: mpsc::UnboundedSender<(StreamKind, Vec<u8>)>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send((stream, buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(%stream, error = %e, "failed to read from child pipe");
                break;
            }
        }
    }
    debug!(%stream, "pipe closed");
}

async fn feed_stdin(mut stdin: ChildStdin, input: String) {
    if let Err(e) = stdin.write_all(input.as_bytes()).await {
        debug!(error = %e, "child stopped reading stdin");
        return;
    }
    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "failed to close child stdin");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn current_thread_runtime() -> Result<tokio::runtime::Runtime, TaskError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TaskError::io("building process runtime", &e))
}

/// Drive `future` to completion on a private runtime.
///
/// Runtimes cannot nest, so when the caller is already inside one the work
/// moves to a scoped helper thread.
fn block_on<F>(future: F) -> Result<F::Output, TaskError>
where
    F: Future + Send,
    F::Output: Send,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return Ok(current_thread_runtime()?.block_on(future));
    }

    thread::scope(|scope| {
        let worker = scope.spawn(move || current_thread_runtime().map(|rt| rt.block_on(future)));
        match worker.join() {
            Ok(output) => output,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
