//! Link service
//!
//! One owner task holds the transport for the lifetime of the session and
//! interleaves two duties: draining submitted commands and polling device
//! status on a fixed cadence. Submission is a message carrying a oneshot
//! reply sender, so a status poll and an application command can never
//! interleave their transport I/O — the queue is the mutual-exclusion
//! boundary.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::command::{Command, Opcode, Response};
use crate::completion::{CompletionTarget, CompletionWatcher};
use crate::config::LinkConfig;
use crate::dispatch::Dispatcher;
use crate::error::{LinkError, Result};
use crate::status::DeviceStatus;
use crate::transport::{SerialTransport, Transport};

enum LinkRequest {
    Submit {
        command: Command,
        reply_tx: oneshot::Sender<Result<Response>>,
    },
    Shutdown,
}

/// Cloneable handle for submitting commands and observing status.
#[derive(Clone)]
pub struct LinkHandle {
    cmd_tx: mpsc::Sender<LinkRequest>,
    status_rx: watch::Receiver<DeviceStatus>,
}

impl LinkHandle {
    /// Submit a command and wait for its resolution.
    pub async fn submit(&self, command: Command) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(LinkRequest::Submit { command, reply_tx })
            .await
            .map_err(|_| LinkError::Closed)?;
        reply_rx.await.map_err(|_| LinkError::Closed)?
    }

    /// Submit and wait, building the command from raw parts.
    pub async fn submit_sync(
        &self,
        opcode: Opcode,
        payload: Vec<u8>,
        expects_reply: bool,
    ) -> Result<Response> {
        let command = if expects_reply {
            Command::new(opcode, payload)
        } else {
            Command::fire_and_forget(opcode, payload)
        };
        self.submit(command).await
    }

    /// Enqueue a command and return a handle resolved once the owner task
    /// has run its send-wait-retry cycle.
    pub async fn submit_async(&self, opcode: Opcode, payload: Vec<u8>) -> Result<PendingReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(LinkRequest::Submit {
                command: Command::new(opcode, payload),
                reply_tx,
            })
            .await
            .map_err(|_| LinkError::Closed)?;
        Ok(PendingReply { reply_rx })
    }

    /// Last published status snapshot.
    pub fn current_status(&self) -> DeviceStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status snapshots as they are published.
    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.status_rx.clone()
    }

    /// Block until the target's activity transitions from active to
    /// inactive (see [`CompletionWatcher`]).
    pub async fn watch_completion(&self, target: CompletionTarget) -> Result<()> {
        CompletionWatcher::new(self.status_rx.clone(), target)
            .wait()
            .await
    }

    /// Ask the owner task to stop. Outstanding requests already queued
    /// behind the shutdown message resolve with [`LinkError::Closed`].
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(LinkRequest::Shutdown).await;
    }
}

/// Reply handle for a queued submission.
pub struct PendingReply {
    reply_rx: oneshot::Receiver<Result<Response>>,
}

impl PendingReply {
    /// Wait for the queued command to resolve.
    pub async fn wait(self) -> Result<Response> {
        self.reply_rx.await.map_err(|_| LinkError::Closed)?
    }
}

/// An open controller session: the owner task plus its handle.
pub struct RobotLink {
    handle: LinkHandle,
    task: JoinHandle<()>,
}

impl RobotLink {
    /// Open the configured serial port and start the owner task.
    pub fn connect(config: LinkConfig) -> Result<Self> {
        let transport = SerialTransport::open(&config)?;
        Ok(Self::with_transport(transport, config))
    }

    /// Start the owner task over an arbitrary transport.
    pub fn with_transport<T: Transport + 'static>(transport: T, config: LinkConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_depth);
        let (status_tx, status_rx) = watch::channel(DeviceStatus::default());
        let dispatcher = Dispatcher::new(transport, &config);
        let poll_interval = config.poll_interval;

        let task = tokio::spawn(owner_loop(dispatcher, cmd_rx, status_tx, poll_interval));

        Self {
            handle: LinkHandle { cmd_tx, status_rx },
            task,
        }
    }

    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    /// Stop the owner task and wait for it to finish.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
        let _ = self.task.await;
    }
}

async fn owner_loop<T: Transport>(
    mut dispatcher: Dispatcher<T>,
    mut cmd_rx: mpsc::Receiver<LinkRequest>,
    status_tx: watch::Sender<DeviceStatus>,
    poll_interval: std::time::Duration,
) {
    // First poll lands one interval in; interval() would tick immediately.
    let mut ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("link owner task started (poll every {poll_interval:?})");

    loop {
        tokio::select! {
            request = cmd_rx.recv() => match request {
                Some(LinkRequest::Submit { command, reply_tx }) => {
                    let result = dispatcher.submit(&command).await;
                    if let Err(e) = &result {
                        warn!("command 0x{:02X} failed: {e}", command.opcode().request_code());
                    }
                    // Receiver may have given up waiting; nothing to do then.
                    let _ = reply_tx.send(result);
                }
                Some(LinkRequest::Shutdown) | None => break,
            },
            _ = ticker.tick() => {
                poll_status(&mut dispatcher, &status_tx).await;
            }
        }
    }

    info!("link owner task stopped");
}

/// One status poll. Failures leave the previous snapshot in place — a
/// momentary poll miss must not stop command flow.
async fn poll_status<T: Transport>(
    dispatcher: &mut Dispatcher<T>,
    status_tx: &watch::Sender<DeviceStatus>,
) {
    match dispatcher.submit(&Command::status_request()).await {
        Ok(response) => match DeviceStatus::from_payload(response.payload()) {
            Some(status) => {
                status_tx.send_replace(status);
            }
            None => warn!(
                "malformed status payload ({} bytes), keeping previous snapshot",
                response.payload().len()
            ),
        },
        Err(e) => debug!("status poll failed, keeping previous snapshot: {e}"),
    }
}
