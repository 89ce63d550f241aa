//! Per-connection session loop
//!
//! Reads one line at a time from the client and drives the
//! `Registering -> Active -> Closing` state machine: name prompt with
//! duplicate re-prompting, command classification, the liveness probe
//! for empty reads, and cleanup on the way out.
//!
//! Every outbound line for the session goes through the dispatcher,
//! which owns the write half from the moment the connection arrives.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::capability::{top_label, SentimentClassifier};
use crate::dispatch::DispatcherHandle;
use crate::error::AppError;
use crate::server::ServerCommand;
use crate::session::Session;
use crate::types::SessionId;

const NAME_PROMPT: &str = "What username would you like to use?";
const LIVENESS_PROMPT: &str = "Press Enter to quit, or enter any other value to remain online:";
const SENTIMENT_UNAVAILABLE: &str = "Sentiment analysis is currently unavailable";

/// Handle one accepted TCP connection
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    dispatcher: DispatcherHandle,
    classifier: Arc<dyn SentimentClassifier>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!("New connection from {}", peer_addr);

    let (reader, writer) = stream.into_split();
    run_session(reader, writer, cmd_tx, dispatcher, classifier).await
}

/// Drive a session over any split byte stream
///
/// Generic over the halves so tests can run the full loop on in-memory
/// streams.
pub async fn run_session<R, W>(
    reader: R,
    writer: W,
    cmd_tx: mpsc::Sender<ServerCommand>,
    dispatcher: DispatcherHandle,
    classifier: Arc<dyn SentimentClassifier>,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let session_id = SessionId::new();
    let mut lines = BufReader::new(reader).lines();

    dispatcher.attach(session_id, Box::new(writer)).await;

    // Registering
    let session = match register(session_id, &mut lines, &cmd_tx, &dispatcher).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            // Client went away before choosing a name.
            dispatcher.detach(session_id).await;
            return Ok(());
        }
        Err(e) => {
            dispatcher.detach(session_id).await;
            return Err(e);
        }
    };

    // Active
    let result = active_loop(
        session_id,
        &mut lines,
        &cmd_tx,
        &dispatcher,
        classifier.as_ref(),
    )
    .await;

    // Closing: leave the registry and release the writer even when the
    // loop failed.
    let _ = cmd_tx.send(ServerCommand::Remove { session_id }).await;
    info!("Session for '{}' closed", session.name);

    result
}

/// Prompt for a display name until registration succeeds
///
/// Returns None if the client disconnects before registering.
async fn register<R>(
    session_id: SessionId,
    lines: &mut Lines<BufReader<R>>,
    cmd_tx: &mpsc::Sender<ServerCommand>,
    dispatcher: &DispatcherHandle,
) -> Result<Option<Session>, AppError>
where
    R: AsyncRead + Unpin,
{
    loop {
        dispatcher.enqueue(session_id, NAME_PROMPT).await;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let name = line.trim().to_string();
        if name.is_empty() {
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        send_command(
            cmd_tx,
            ServerCommand::Register {
                session_id,
                name,
                reply: reply_tx,
            },
        )
        .await?;

        match reply_rx.await.map_err(|_| AppError::ChannelSend)? {
            Ok(session) => return Ok(Some(session)),
            Err(e @ (AppError::DuplicateName(_) | AppError::EmptyName)) => {
                dispatcher.enqueue(session_id, e.to_string()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read and classify lines until the client leaves
async fn active_loop<R>(
    session_id: SessionId,
    lines: &mut Lines<BufReader<R>>,
    cmd_tx: &mpsc::Sender<ServerCommand>,
    dispatcher: &DispatcherHandle,
    classifier: &dyn SentimentClassifier,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(line) = lines.next_line().await? else {
            debug!("Session {} hit EOF", session_id);
            return Ok(());
        };
        let line = line.trim().to_string();

        if line == "/users" {
            send_command(cmd_tx, ServerCommand::ListUsers { session_id }).await?;
        } else if line.starts_with("/dm") {
            send_command(cmd_tx, ServerCommand::Direct { session_id, raw: line }).await?;
        } else if let Some(text) = line.strip_prefix("/sentiment") {
            let reply = match classifier.classify(text.trim()).await {
                Ok(scores) => match top_label(&scores) {
                    Some(label) => label.to_string(),
                    None => SENTIMENT_UNAVAILABLE.to_string(),
                },
                Err(e) => {
                    warn!("Sentiment lookup for {} failed: {}", session_id, e);
                    SENTIMENT_UNAVAILABLE.to_string()
                }
            };
            dispatcher.enqueue(session_id, reply).await;
        } else if line == "exit" {
            debug!("Session {} requested exit", session_id);
            return Ok(());
        } else if line.is_empty() {
            // A bare Enter and a half-closed peer read the same; ask
            // once more to tell them apart.
            dispatcher.enqueue(session_id, LIVENESS_PROMPT).await;
            match lines.next_line().await? {
                None => return Ok(()),
                Some(response) if response.trim().is_empty() => {
                    debug!("Session {} confirmed disconnect", session_id);
                    return Ok(());
                }
                Some(_) => {} // still here
            }
        } else {
            send_command(cmd_tx, ServerCommand::Chat { session_id, text: line }).await?;
        }
    }
}

async fn send_command(
    cmd_tx: &mpsc::Sender<ServerCommand>,
    cmd: ServerCommand,
) -> Result<(), AppError> {
    cmd_tx.send(cmd).await.map_err(|_| AppError::ChannelSend)
}
