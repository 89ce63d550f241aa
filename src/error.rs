//! Error types for the chat server
//!
//! Defines application-level errors covering both fatal conditions
//! (connection/channel breakage) and business errors that are reported
//! back to the issuing session as a plain-text notice.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the affected session)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Display name already taken by a live session
    #[error("The name '{0}' is already taken")]
    DuplicateName(String),

    /// Display name was empty
    #[error("A display name must not be empty")]
    EmptyName,

    /// DM target does not match any live session
    #[error("No connected user named '{0}'")]
    NoSuchRecipient(String),

    /// Command could not be parsed
    #[error("Could not parse command: {0}")]
    MalformedCommand(String),

    /// Sentiment or translation service did not produce a usable answer
    #[error("Classifier unavailable")]
    ClassifierUnavailable,

    /// Write target's stream is already closed
    #[error("Stream closed")]
    StreamClosed,
}
