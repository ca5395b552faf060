//! Shell command execution with live output capture and polling assertions

use crate::{HarnessConfig, HarnessError, Result, Template};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long the stream readers may keep draining after the child exits.
/// Background grandchildren can hold a pipe open indefinitely, so this only
/// bounds reads that snapshot final output, never the exit itself.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Append-only buffer filled by a reader task and inspected by assertions
#[derive(Debug, Default)]
struct Captured {
    bytes: Mutex<Vec<u8>>,
    grew: Notify,
}

impl Captured {
    fn append(&self, chunk: &[u8]) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(chunk);
        self.grew.notify_waiters();
    }

    /// Byte offset just past the first `needle` at or after `from`
    fn find_from(&self, from: usize, needle: &[u8]) -> Option<usize> {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        let haystack = bytes.get(from..)?;
        if needle.is_empty() {
            return Some(from);
        }
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|i| from + i + needle.len())
    }

    fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).to_string()
    }
}

/// Spawns rendered command lines through the configured shell
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: HarnessConfig,
}

impl Runner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout
    }

    /// Render `template` and start it under `<shell> -c`.
    ///
    /// Only a failure to create the child is an error here; its exit code is
    /// left to [`ProcessHandle::wait_for_exit`]. Must be called from within a
    /// tokio runtime.
    pub fn run(&self, template: &Template) -> Result<ProcessHandle> {
        let command = template.render()?;
        tracing::info!(%command, "running");
        println!("{command}");

        let mut child = tokio::process::Command::new(&self.config.shell)
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = Arc::new(Captured::default());
        let stderr = Arc::new(Captured::default());
        let readers = [
            spawn_reader(child.stdout.take(), Arc::clone(&stdout), Stream::Stdout),
            spawn_reader(child.stderr.take(), Arc::clone(&stderr), Stream::Stderr),
        ];

        let (exit_tx, exit_rx) = watch::channel(None);
        let (drained_tx, drained_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        tokio::spawn(watch_exit(
            child,
            readers,
            exit_tx,
            drained_tx,
            cancel.clone(),
            command.clone(),
        ));

        Ok(ProcessHandle {
            command,
            stdout,
            stderr,
            exit: exit_rx,
            drained: drained_rx,
            cancel,
            stdout_cursor: 0,
            stderr_cursor: 0,
        })
    }

    /// Run `template`, block until it exits and hand back its stdout.
    ///
    /// A non-zero exit becomes [`HarnessError::CommandFailed`] carrying stderr.
    /// There is no timeout: use this for short setup commands only.
    pub async fn run_to_completion(&self, template: &Template) -> Result<String> {
        let mut handle = self.run(template)?;
        let status = handle.exit_status().await?;
        handle.output_drained().await;
        if status.success() {
            Ok(handle.stdout())
        } else {
            Err(HarnessError::CommandFailed {
                command: handle.command().to_string(),
                code: status.code(),
                stderr: handle.stderr(),
            })
        }
    }
}

fn spawn_reader<R>(reader: Option<R>, captured: Arc<Captured>, stream: Stream) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut reader) = reader else {
            return;
        };
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    tracing::trace!(%stream, bytes = n, "captured output");
                    captured.append(&buf[..n]);
                }
                Err(e) => {
                    tracing::warn!(%stream, error = %e, "failed to read child output");
                    break;
                }
            }
        }
    })
}

async fn watch_exit(
    mut child: tokio::process::Child,
    readers: [JoinHandle<()>; 2],
    exit: watch::Sender<Option<ExitStatus>>,
    drained: watch::Sender<bool>,
    cancel: CancellationToken,
    command: String,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            tracing::debug!(%command, "killing process");
            if let Err(e) = child.start_kill() {
                tracing::warn!(%command, error = %e, "failed to kill process");
            }
            child.wait().await
        }
    };

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            // dropping the sender tells waiters the status is unknowable
            tracing::error!(%command, error = %e, "failed to wait for process");
            return;
        }
    };

    tracing::debug!(%command, code = ?status.code(), "process exited");
    let _ = exit.send(Some(status));

    let finished = tokio::time::timeout(DRAIN_GRACE, async {
        for reader in readers {
            let _ = reader.await;
        }
    })
    .await;
    if finished.is_err() {
        tracing::debug!(%command, "output still open after exit, treating it as drained");
    }
    let _ = drained.send(true);
}

/// A running or finished shell command.
///
/// Captured output keeps growing while the child runs. Dropping the handle
/// kills the child if it is still alive.
#[derive(Debug)]
pub struct ProcessHandle {
    command: String,
    stdout: Arc<Captured>,
    stderr: Arc<Captured>,
    exit: watch::Receiver<Option<ExitStatus>>,
    /// Set once both streams hit EOF, or `DRAIN_GRACE` after exit
    drained: watch::Receiver<bool>,
    cancel: CancellationToken,
    stdout_cursor: usize,
    stderr_cursor: usize,
}

impl ProcessHandle {
    /// The rendered command line
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// `None` while running, or when the child died from a signal
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.borrow().and_then(|status| status.code())
    }

    /// Everything captured on stdout so far
    pub fn stdout(&self) -> String {
        self.stdout.contents()
    }

    /// Everything captured on stderr so far
    pub fn stderr(&self) -> String {
        self.stderr.contents()
    }

    /// Ask the child to terminate; the exit is observed like any other.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    async fn exit_status(&mut self) -> Result<ExitStatus> {
        let status = self
            .exit
            .wait_for(Option::is_some)
            .await
            .map(|status| *status);
        match status {
            Ok(Some(status)) => Ok(status),
            _ => Err(HarnessError::ExitUnknown {
                command: self.command.clone(),
            }),
        }
    }

    /// Wait until the readers are done with output written before exit
    async fn output_drained(&mut self) {
        // a dropped sender means the waiter task is gone; nothing more will arrive
        let _ = self.drained.wait_for(|done| *done).await;
    }

    /// Wait up to `timeout` for the child to exit
    pub async fn wait(&mut self, timeout: Duration) -> Result<ExitStatus> {
        let waited = tokio::time::timeout(timeout, self.exit_status()).await;
        match waited {
            Ok(status) => status,
            Err(_) => Err(HarnessError::ExitTimeout {
                command: self.command.clone(),
                timeout,
            }),
        }
    }

    /// Succeeds only if the child exits with exactly `expected` within `timeout`.
    pub async fn wait_for_exit(&mut self, expected: i32, timeout: Duration) -> Result<()> {
        let status = self.wait(timeout).await?;
        if status.code() == Some(expected) {
            return Ok(());
        }
        tracing::warn!(command = %self.command, expected, actual = ?status.code(), "unexpected exit code");
        self.output_drained().await;
        Err(HarnessError::ExitCodeMismatch {
            command: self.command.clone(),
            expected,
            actual: status.code(),
            stdout: self.stdout(),
            stderr: self.stderr(),
        })
    }

    /// Wait until stdout contains the rendered `pattern`.
    ///
    /// Matching starts where the previous successful match on this stream
    /// ended, so consecutive calls assert output order. The child does not
    /// have to exit. A pattern that never shows up fails once `timeout`
    /// has elapsed, even if the child finished earlier.
    pub async fn wait_for_output(&mut self, pattern: &Template, timeout: Duration) -> Result<()> {
        self.wait_for_stream(Stream::Stdout, pattern, timeout).await
    }

    /// [`ProcessHandle::wait_for_output`] for stderr
    pub async fn wait_for_stderr(&mut self, pattern: &Template, timeout: Duration) -> Result<()> {
        self.wait_for_stream(Stream::Stderr, pattern, timeout).await
    }

    async fn wait_for_stream(
        &mut self,
        stream: Stream,
        pattern: &Template,
        timeout: Duration,
    ) -> Result<()> {
        let needle = pattern.render()?;
        let deadline = tokio::time::Instant::now() + timeout;
        let (captured, cursor) = match stream {
            Stream::Stdout => (Arc::clone(&self.stdout), &mut self.stdout_cursor),
            Stream::Stderr => (Arc::clone(&self.stderr), &mut self.stderr_cursor),
        };

        loop {
            // register interest before looking, so no append slips between
            let grew = captured.grew.notified();
            tokio::pin!(grew);
            grew.as_mut().enable();

            if let Some(end) = captured.find_from(*cursor, needle.as_bytes()) {
                tracing::debug!(command = %self.command, %stream, pattern = %needle, "output matched");
                *cursor = end;
                return Ok(());
            }

            if tokio::time::timeout_at(deadline, grew).await.is_err() {
                tracing::warn!(command = %self.command, %stream, pattern = %needle, "output did not appear");
                return Err(HarnessError::OutputTimeout {
                    command: self.command.clone(),
                    stream,
                    pattern: needle,
                    timeout,
                    captured: captured.contents(),
                });
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
