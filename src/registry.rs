//! UserRegistry: the set of currently connected sessions
//!
//! Keeps join order for the `/users` listing and hands out palette
//! colors cyclically. All access is serialized by the `ChatServer`
//! actor, so registry mutation and broadcast iteration never
//! interleave.

use std::collections::HashMap;

use crate::color::PALETTE;
use crate::error::AppError;
use crate::session::Session;
use crate::types::SessionId;

/// Registry of live sessions
#[derive(Debug, Default)]
pub struct UserRegistry {
    /// All registered sessions: SessionId -> Session
    sessions: HashMap<SessionId, Session>,
    /// Session ids in join order, for the `/users` listing
    join_order: Vec<SessionId>,
    /// Index of the most recently assigned palette color
    last_color: usize,
}

impl UserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `name`
    ///
    /// Rejects empty names and names already taken by a live session.
    /// The palette cursor advances on every successful registration and
    /// wraps at the palette length, so the Nth registration receives
    /// palette index `N mod PALETTE.len()`.
    pub fn register(&mut self, id: SessionId, name: String) -> Result<Session, AppError> {
        if name.is_empty() {
            return Err(AppError::EmptyName);
        }
        if self.find(&name).is_some() {
            return Err(AppError::DuplicateName(name));
        }

        self.last_color = (self.last_color + 1) % PALETTE.len();
        let session = Session::new(id, name, PALETTE[self.last_color]);
        self.sessions.insert(id, session.clone());
        self.join_order.push(id);
        Ok(session)
    }

    /// Remove a session, returning it if it was registered
    ///
    /// Idempotent: removing an absent id is a no-op.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.join_order.retain(|other| *other != id);
        self.sessions.remove(&id)
    }

    /// Display names of all live sessions, in join order
    pub fn list_names(&self) -> Vec<&str> {
        self.join_order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .map(|session| session.name.as_str())
            .collect()
    }

    /// Exact-match lookup by display name, used for DM targeting
    pub fn find(&self, name: &str) -> Option<&Session> {
        self.sessions.values().find(|session| session.name == name)
    }

    /// Lookup by session id
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Snapshot of every live session, in join order
    ///
    /// Broadcast iteration works on this clone so a concurrent removal
    /// can never be observed mid-iteration.
    pub fn all(&self) -> Vec<Session> {
        self.join_order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .cloned()
            .collect()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Mark a session as wanting incoming chat translated to `lang`
    ///
    /// No client command sets this; it exists for collaborators that
    /// manage per-user language preferences. Defaults to off.
    pub fn set_translation(&mut self, id: SessionId, lang: Option<String>) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.translate_to = lang;
        }
    }
}
