//! Session struct definition
//!
//! Represents one registered chat participant. This is metadata only:
//! the connection's read half lives in the session task and the write
//! half is owned by the outbound dispatcher.

use crate::color::Color;
use crate::types::SessionId;

/// Registered chat participant
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Display name, chosen once at registration
    pub name: String,
    /// Presentation color assigned from the rotating palette
    pub color: Color,
    /// Target language for incoming chat; None means deliver as-is
    pub translate_to: Option<String>,
}

impl Session {
    /// Create a new session with the given identity and color
    pub fn new(id: SessionId, name: String, color: Color) -> Self {
        Self {
            id,
            name,
            color,
            translate_to: None,
        }
    }

    /// Whether incoming chat should be translated for this session
    pub fn wants_translation(&self) -> bool {
        self.translate_to.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PALETTE;

    #[test]
    fn test_session_creation() {
        let session = Session::new(SessionId::new(), "Alice".to_string(), PALETTE[0]);

        assert_eq!(session.name, "Alice");
        assert_eq!(session.color, PALETTE[0]);
        assert!(!session.wants_translation());
    }

    #[test]
    fn test_session_translation_flag() {
        let mut session = Session::new(SessionId::new(), "Alice".to_string(), PALETTE[0]);
        session.translate_to = Some("fr".to_string());
        assert!(session.wants_translation());
    }
}
