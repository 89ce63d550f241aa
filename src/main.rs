//! Line-oriented TCP Chat Server - Entry Point
//!
//! Starts the outbound dispatcher, the ChatServer actor and the TCP
//! listener, spawning one session task per accepted connection.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatline::{
    handle_connection, ChatServer, HttpSentimentClassifier, OutboundDispatcher, Router,
    SentimentClassifier,
};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:8888";

/// Default sentiment service endpoint
const DEFAULT_SENTIMENT_URL: &str = "http://127.0.0.1:5000/detect-sentiment";

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatline=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatline=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());

    // Sentiment service endpoint, overridable via environment
    let sentiment_url =
        env::var("SENTIMENT_URL").unwrap_or_else(|_| DEFAULT_SENTIMENT_URL.to_string());

    // Start TCP listener
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat server listening on {}", addr);

    // Start the outbound delivery worker
    let (dispatcher, outbound) = OutboundDispatcher::new();
    tokio::spawn(outbound.run());

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let router = Router::new(dispatcher.clone());
    tokio::spawn(ChatServer::new(cmd_rx, router, dispatcher.clone()).run());

    info!("ChatServer actor started");

    let classifier: Arc<dyn SentimentClassifier> =
        Arc::new(HttpSentimentClassifier::new(sentiment_url));

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let dispatcher = dispatcher.clone();
                let classifier = classifier.clone();

                // Spawn a session task for each connection; a session's
                // failure never reaches its neighbors.
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, dispatcher, classifier).await
                    {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
