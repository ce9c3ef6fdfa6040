//! Background task that forwards one child's output to the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::process::{self, MergedOutput};
use crate::protocol::ServerMessage;

/// How long output may keep flowing once a cancelled child has been reaped.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Ask the relay to stop its child. `done` fires once the child has exited.
pub(crate) struct CancelRequest {
    pub notify: bool,
    pub done: oneshot::Sender<()>,
}

pub(crate) struct Relay {
    pub child: Child,
    pub output: MergedOutput,
    pub group: Option<i32>,
    pub grace: Duration,
    pub running: Arc<AtomicBool>,
    pub outbound: mpsc::Sender<ServerMessage>,
    pub cancel_rx: mpsc::Receiver<CancelRequest>,
}

impl Relay {
    /// Relay lines until EOF, then report the exit code exactly once.
    ///
    /// Sends await queue capacity, which throttles a chatty child down to the
    /// speed of the socket without dropping or reordering anything.
    pub async fn run(mut self) {
        let pid = self.child.id();
        // Set once the child has been cancelled; output is abandoned after it.
        let mut drain_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                line = self.output.next_line() => {
                    let Some(line) = line else { break };
                    let text = String::from_utf8_lossy(&line).into_owned();
                    self.emit(ServerMessage::stdout(text)).await;
                }
                Some(req) = self.cancel_rx.recv(), if drain_deadline.is_none() => {
                    self.cancel(req, pid).await;
                    drain_deadline = Some(Instant::now() + OUTPUT_DRAIN_GRACE);
                }
                _ = time::sleep_until(drain_deadline.unwrap_or_else(Instant::now)), if drain_deadline.is_some() => {
                    // A process outside the group still holds the write end.
                    tracing::warn!(?pid, "output still open after cancel; abandoning it");
                    self.output.close();
                    break;
                }
            }
        }

        // A child may close its pipe and keep running; stay cancellable.
        let status = loop {
            tokio::select! {
                status = self.child.wait() => break status,
                Some(req) = self.cancel_rx.recv(), if drain_deadline.is_none() => {
                    self.cancel(req, pid).await;
                    drain_deadline = Some(Instant::now());
                }
            }
        };

        let return_code = match status {
            Ok(status) => process::return_code(status),
            Err(e) => {
                tracing::error!(?pid, error = %e, "failed to collect exit status");
                -1
            }
        };
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(?pid, return_code, "command finished");
        self.emit(ServerMessage::finished(return_code)).await;
    }

    async fn cancel(&mut self, req: CancelRequest, pid: Option<u32>) {
        if let Err(e) = process::terminate(&mut self.child, self.group, self.grace).await {
            tracing::error!(?pid, error = %e, "failed to stop command");
        }
        self.running.store(false, Ordering::SeqCst);
        if req.notify {
            self.emit(ServerMessage::cancelled()).await;
        }
        let _ = req.done.send(());
        tracing::info!(?pid, "command cancelled");
    }

    async fn emit(&self, msg: ServerMessage) {
        // Client gone: keep draining so the child never blocks on a full pipe.
        if self.outbound.send(msg).await.is_err() {
            tracing::trace!("outbound queue closed; dropping message");
        }
    }
}
