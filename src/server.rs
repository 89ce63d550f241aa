//! ChatServer actor implementation
//!
//! The central actor owning the user registry and the router. Session
//! tasks send `ServerCommand`s over an mpsc channel; because the actor
//! processes one command at a time, registry mutation and broadcast
//! iteration are mutually exclusive by construction.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::dispatch::DispatcherHandle;
use crate::error::AppError;
use crate::registry::UserRegistry;
use crate::router::Router;
use crate::session::Session;
use crate::types::SessionId;

/// Commands sent from session tasks to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Register a connected client under a display name
    Register {
        session_id: SessionId,
        name: String,
        reply: oneshot::Sender<Result<Session, AppError>>,
    },
    /// Remove a session, detach its writer and announce the departure
    Remove { session_id: SessionId },
    /// Relay a chat line to everyone but the sender
    Chat { session_id: SessionId, text: String },
    /// Deliver a `/dm :name: ...` command
    Direct { session_id: SessionId, raw: String },
    /// Reply to the requester with the user list, in join order
    ListUsers { session_id: SessionId },
}

/// The main ChatServer actor
pub struct ChatServer {
    registry: UserRegistry,
    router: Router,
    dispatcher: DispatcherHandle,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(
        receiver: mpsc::Receiver<ServerCommand>,
        router: Router,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            registry: UserRegistry::new(),
            router,
            dispatcher,
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders
    /// are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register {
                session_id,
                name,
                reply,
            } => {
                self.handle_register(session_id, name, reply).await;
            }
            ServerCommand::Remove { session_id } => {
                self.handle_remove(session_id).await;
            }
            ServerCommand::Chat { session_id, text } => {
                self.router.forward(&self.registry, session_id, &text).await;
            }
            ServerCommand::Direct { session_id, raw } => {
                self.handle_direct(session_id, raw).await;
            }
            ServerCommand::ListUsers { session_id } => {
                self.handle_list_users(session_id).await;
            }
        }
    }

    /// Handle a registration attempt
    async fn handle_register(
        &mut self,
        session_id: SessionId,
        name: String,
        reply: oneshot::Sender<Result<Session, AppError>>,
    ) {
        let result = self.registry.register(session_id, name);

        if let Ok(session) = &result {
            info!("Session {} registered as '{}'", session_id, session.name);
            debug!("Total sessions: {}", self.registry.len());
            self.router
                .broadcast_announcement(&self.registry, &format!("{} joined!", session.name))
                .await;
        }

        let _ = reply.send(result);
    }

    /// Handle a session leaving
    ///
    /// The detach is enqueued before the departure broadcast, so any
    /// lines already queued for the leaver drain first and the
    /// announcement reaches only the remaining sessions.
    async fn handle_remove(&mut self, session_id: SessionId) {
        let Some(session) = self.registry.remove(session_id) else {
            // Never registered (gave up during the name prompt).
            self.dispatcher.detach(session_id).await;
            return;
        };

        info!("Session {} ('{}') removed", session_id, session.name);
        debug!("Total sessions: {}", self.registry.len());

        self.dispatcher.detach(session_id).await;
        self.router
            .broadcast_announcement(&self.registry, &format!("{} left!", session.name))
            .await;
    }

    /// Handle a `/dm` command, reporting failure only to the sender
    async fn handle_direct(&mut self, session_id: SessionId, raw: String) {
        if let Err(e) = self.router.send_direct(&self.registry, session_id, &raw).await {
            debug!("DM from {} failed: {}", session_id, e);
            self.dispatcher.enqueue(session_id, e.to_string()).await;
        }
    }

    /// Handle a `/users` command
    async fn handle_list_users(&mut self, session_id: SessionId) {
        let line = format!("Current users: {}", self.registry.list_names().join(", "));
        self.dispatcher.enqueue(session_id, line).await;
    }
}
