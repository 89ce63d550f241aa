//! Line-oriented TCP Chat Server Library
//!
//! A chat server where clients connect over plain TCP, pick a display
//! name, and exchange broadcasts, DMs, and simple slash commands.
//!
//! # Features
//! - Name registration with duplicate rejection and re-prompting
//! - Colored broadcast chat (sender excluded from its own messages)
//! - `/users` listing in join order
//! - `/dm :name: text` direct messages
//! - `/sentiment text` classification via an external HTTP service
//! - Liveness probe to tell a bare Enter from a half-closed peer
//! - Optional per-recipient translation with graceful fallback
//!
//! # Architecture
//! Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the `UserRegistry` and
//!   `Router`; no locks needed, all state access goes through message
//!   passing
//! - `OutboundDispatcher` is a second actor whose single worker owns
//!   every session's write half, so outbound lines are never
//!   interleaved and per-recipient order equals enqueue order
//! - Each connection runs its own session task communicating with both
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chatline::{
//!     handle_connection, ChatServer, HttpSentimentClassifier, OutboundDispatcher, Router,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8888").await.unwrap();
//!
//!     let (dispatcher, outbound) = OutboundDispatcher::new();
//!     tokio::spawn(outbound.run());
//!
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!     let router = Router::new(dispatcher.clone());
//!     tokio::spawn(ChatServer::new(cmd_rx, router, dispatcher.clone()).run());
//!
//!     let classifier = Arc::new(HttpSentimentClassifier::new(
//!         "http://127.0.0.1:5000/detect-sentiment",
//!     ));
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(
//!             stream,
//!             cmd_tx.clone(),
//!             dispatcher.clone(),
//!             classifier.clone(),
//!         ));
//!     }
//! }
//! ```

pub mod capability;
pub mod color;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use capability::{
    top_label, HttpSentimentClassifier, HttpTranslator, SentimentClassifier, Translator,
};
pub use color::{Color, PALETTE, RESET};
pub use dispatch::{DispatcherHandle, OutboundDispatcher};
pub use error::AppError;
pub use handler::{handle_connection, run_session};
pub use registry::UserRegistry;
pub use router::Router;
pub use server::{ChatServer, ServerCommand};
pub use session::Session;
pub use types::SessionId;
