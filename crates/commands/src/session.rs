//! Per-connection command session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::process;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::relay::{CancelRequest, Relay};
use crate::runner::CommandRunner;

/// The job currently (or most recently) owned by a session.
struct Job {
    pid: Option<u32>,
    group: Option<i32>,
    running: Arc<AtomicBool>,
    cancel_tx: mpsc::Sender<CancelRequest>,
    relay: JoinHandle<()>,
}

impl Job {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the child (if live) and wait for the relay to finish.
    async fn stop(self, notify: bool) {
        if self.is_running() {
            let (done_tx, done_rx) = oneshot::channel();
            let req = CancelRequest {
                notify,
                done: done_tx,
            };
            // Either side failing means the relay already saw EOF.
            if self.cancel_tx.send(req).await.is_ok() {
                let _ = done_rx.await;
            }
        }
        if let Err(e) = self.relay.await {
            tracing::error!(pid = ?self.pid, error = %e, "relay task failed");
        }
    }
}

/// Mediates between one client connection and at most one child process.
///
/// The session is driven by the connection task through `&mut self`; the
/// relay task owns the child and talks back over channels, so no lock guards
/// the process handle.
pub struct CommandSession {
    runner: Arc<CommandRunner>,
    outbound: mpsc::Sender<ServerMessage>,
    job: Option<Job>,
}

impl CommandSession {
    /// Start an idle session. Nothing is sent to the client.
    pub fn open(runner: Arc<CommandRunner>, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            runner,
            outbound,
            job: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.as_ref().is_some_and(Job::is_running)
    }

    /// Pid of the live child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.job.as_ref().filter(|j| j.is_running()).and_then(|j| j.pid)
    }

    /// Dispatch one raw client frame. Unparseable frames are dropped.
    pub async fn handle_message(&mut self, raw: &str) {
        match ClientMessage::parse(raw) {
            Ok(ClientMessage::StartCommand { command }) => self.start_command(&command).await,
            Ok(ClientMessage::CancelCommand) => self.cancel_command().await,
            Err(e) => tracing::debug!(error = %e, "ignoring malformed client message"),
        }
    }

    pub async fn start_command(&mut self, command_line: &str) {
        if self.is_running() {
            self.send(ServerMessage::already_running()).await;
            return;
        }

        // The previous relay may still be flushing its `finished` message.
        if let Some(previous) = self.job.take() {
            previous.stop(false).await;
        }

        let spawned = match self.runner.spawn(command_line) {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::warn!(command = command_line, error = %e, "failed to start command");
                self.send(ServerMessage::spawn_failed(e.to_string())).await;
                return;
            }
        };
        tracing::info!(pid = ?spawned.pid, command = command_line, "command started");

        let running = Arc::new(AtomicBool::new(true));
        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        let relay = Relay {
            child: spawned.child,
            output: spawned.output,
            group: spawned.group,
            grace: self.runner.terminate_grace(),
            running: running.clone(),
            outbound: self.outbound.clone(),
            cancel_rx,
        };

        self.job = Some(Job {
            pid: spawned.pid,
            group: spawned.group,
            running,
            cancel_tx,
            relay: tokio::spawn(relay.run()),
        });
    }

    /// Stop the live child and wait until it has exited. No-op when idle.
    pub async fn cancel_command(&mut self) {
        let Some(job) = self.job.as_ref().filter(|j| j.is_running()) else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        let req = CancelRequest {
            notify: true,
            done: done_tx,
        };
        if job.cancel_tx.send(req).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Tear down on disconnect: kill any live child and join the relay.
    pub async fn close(&mut self, code: Option<u16>) {
        if let Some(job) = self.job.take() {
            if job.is_running() {
                tracing::info!(pid = ?job.pid, ?code, "connection closed with command running; stopping it");
            }
            job.stop(false).await;
        }
    }

    async fn send(&self, msg: ServerMessage) {
        let _ = self.outbound.send(msg).await;
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        // `kill_on_drop` only reaches the direct child; take its group too.
        if let Some(job) = self.job.take() {
            if job.is_running() {
                process::kill_group(job.group);
            }
            job.relay.abort();
        }
    }
}
