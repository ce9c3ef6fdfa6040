//! Child process plumbing: merged output, termination, exit codes.

use std::io::{self, PipeReader};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lines read from the child before the relay picks them up.
const LINE_BUFFER: usize = 64;

/// Spawn `cmd` with stdout and stderr writing into one shared pipe.
///
/// Both descriptors refer to the same pipe, so lines arrive in the order the
/// child wrote them. `cmd` is consumed: it holds the parent's copies of the
/// write end, and EOF only arrives once those are closed.
pub fn spawn_merged(mut cmd: Command) -> io::Result<(Child, MergedOutput)> {
    let (reader, stdout) = io::pipe()?;
    let stderr = stdout.try_clone()?;
    cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));

    let child = cmd.spawn()?;
    drop(cmd);

    Ok((child, MergedOutput::from_pipe(reader)?))
}

/// The combined stdout/stderr stream of one child, split into lines.
///
/// Lines keep their terminator. The stream ends at EOF, i.e. once every
/// process holding the write end has exited.
pub struct MergedOutput {
    rx: mpsc::Receiver<Vec<u8>>,
    reader: JoinHandle<()>,
}

impl MergedOutput {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        Self {
            rx,
            reader: tokio::spawn(pump(reader, tx)),
        }
    }

    #[cfg(unix)]
    fn from_pipe(reader: PipeReader) -> io::Result<Self> {
        let fd = std::os::fd::OwnedFd::from(reader);
        let receiver = tokio::net::unix::pipe::Receiver::from_owned_fd(fd)?;
        Ok(Self::new(receiver))
    }

    #[cfg(not(unix))]
    fn from_pipe(reader: PipeReader) -> io::Result<Self> {
        use std::io::BufRead;

        // No async pipe type here; read on the blocking pool instead.
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let reader = tokio::task::spawn_blocking(move || {
            let mut reader = io::BufReader::new(reader);
            loop {
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Ok(Self { rx, reader })
    }

    /// Stop reading. Lines not yet picked up are discarded.
    pub fn close(&mut self) {
        self.reader.abort();
        self.rx.close();
    }

    /// Next raw line, or `None` at EOF.
    pub async fn next_line(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

impl Drop for MergedOutput {
    fn drop(&mut self) {
        // Closes our read end even if a straggler still holds the write end.
        self.reader.abort();
    }
}

async fn pump<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<Vec<u8>>) {
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "output pipe read failed");
                break;
            }
        }
    }
}

/// Map an exit status onto the integer reported to clients.
///
/// A child killed by a signal reports the negated signal number.
pub fn return_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Stop a child: terminate request, bounded wait, then forced kill.
///
/// `group` is the process group created at spawn (unix). Signals go to the
/// whole group so helpers started by the runner die with it.
pub async fn terminate(child: &mut Child, group: Option<i32>, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        kill_group(group);
        return Ok(status);
    }

    request_terminate(child, group);

    let status = match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            tracing::warn!(
                pid = ?child.id(),
                ?grace,
                "process ignored terminate request; killing"
            );
            kill_group(group);
            let _ = child.start_kill();
            child.wait().await?
        }
    };

    // Reap stragglers still holding the output pipes.
    kill_group(group);
    Ok(status)
}

#[cfg(unix)]
fn request_terminate(child: &mut Child, group: Option<i32>) {
    if !signal_group(group, libc::SIGTERM) {
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child, _group: Option<i32>) {
    let _ = child.start_kill();
}

/// SIGKILL every process left in the child's group.
#[cfg(unix)]
pub(crate) fn kill_group(group: Option<i32>) {
    signal_group(group, libc::SIGKILL);
}

#[cfg(not(unix))]
pub(crate) fn kill_group(_group: Option<i32>) {}

#[cfg(unix)]
fn signal_group(group: Option<i32>, signal: libc::c_int) -> bool {
    let Some(pgid) = group.filter(|pgid| *pgid > 0) else {
        return false;
    };
    // Negative pid addresses the process group.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(-pgid, signal) };
    rc == 0
}
