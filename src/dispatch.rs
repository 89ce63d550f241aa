//! OutboundDispatcher: the serialized outbound write path
//!
//! Every line the server sends to any client funnels through a single
//! delivery worker that owns all session write halves. One worker means
//! writes are never interleaved mid-line, per-recipient delivery order
//! equals enqueue order, and a dead recipient never disturbs the rest
//! of the queue.

use std::collections::HashMap;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::AppError;
use crate::types::SessionId;

/// Write half the dispatcher owns for each attached session
pub type SessionWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Queue capacity; a full queue applies backpressure to enqueuers
const QUEUE_CAPACITY: usize = 256;

/// Commands processed by the delivery worker in strict FIFO order
pub enum DispatchCommand {
    /// Take ownership of a session's write half
    Attach {
        id: SessionId,
        writer: SessionWriter,
    },
    /// Drop a session's write half; later jobs for it are discarded
    Detach { id: SessionId },
    /// Write one line (newline appended) to a session
    Deliver { id: SessionId, line: String },
}

impl std::fmt::Debug for DispatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attach { id, .. } => f.debug_struct("Attach").field("id", id).finish_non_exhaustive(),
            Self::Detach { id } => f.debug_struct("Detach").field("id", id).finish(),
            Self::Deliver { id, line } => f
                .debug_struct("Deliver")
                .field("id", id)
                .field("line", line)
                .finish(),
        }
    }
}

/// Cloneable handle for submitting write jobs
///
/// All submissions are fire-and-forget: delivery failure is contained
/// in the worker and never surfaces to the caller.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<DispatchCommand>,
}

impl DispatcherHandle {
    /// Hand a session's write half to the delivery worker
    pub async fn attach(&self, id: SessionId, writer: SessionWriter) {
        let _ = self.tx.send(DispatchCommand::Attach { id, writer }).await;
    }

    /// Release a session's write half
    ///
    /// Jobs enqueued before the detach are still delivered.
    pub async fn detach(&self, id: SessionId) {
        let _ = self.tx.send(DispatchCommand::Detach { id }).await;
    }

    /// Queue one line for delivery to `id`
    pub async fn enqueue(&self, id: SessionId, line: impl Into<String>) {
        let _ = self
            .tx
            .send(DispatchCommand::Deliver {
                id,
                line: line.into(),
            })
            .await;
    }
}

/// The delivery worker
pub struct OutboundDispatcher {
    /// Write halves of every attached session
    writers: HashMap<SessionId, SessionWriter>,
    /// Job queue receiver
    receiver: mpsc::Receiver<DispatchCommand>,
}

impl OutboundDispatcher {
    /// Create the dispatcher and a handle to feed it
    pub fn new() -> (DispatcherHandle, Self) {
        let (tx, receiver) = mpsc::channel(QUEUE_CAPACITY);
        (
            DispatcherHandle { tx },
            Self {
                writers: HashMap::new(),
                receiver,
            },
        )
    }

    /// Run the delivery loop until every handle is dropped
    pub async fn run(mut self) {
        info!("Outbound dispatcher started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                DispatchCommand::Attach { id, writer } => {
                    debug!("Attached writer for {}", id);
                    self.writers.insert(id, writer);
                }
                DispatchCommand::Detach { id } => {
                    if let Some(mut writer) = self.writers.remove(&id) {
                        debug!("Detached writer for {}", id);
                        let _ = writer.shutdown().await;
                    }
                }
                DispatchCommand::Deliver { id, line } => {
                    if let Err(e) = self.deliver(id, line).await {
                        // Contained by design: the sender never learns
                        // about a recipient's dead stream.
                        debug!("Dropping line for {}: {}", id, e);
                        self.writers.remove(&id);
                    }
                }
            }
        }

        info!("Outbound dispatcher shutting down");
    }

    /// Write one newline-terminated line to the target's stream
    async fn deliver(&mut self, id: SessionId, line: String) -> Result<(), AppError> {
        let writer = self.writers.get_mut(&id).ok_or(AppError::StreamClosed)?;
        let mut buf = line.into_bytes();
        buf.push(b'\n');
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }
}
