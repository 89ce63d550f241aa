//! ANSI color palette for chat display
//!
//! Each session gets a color from a fixed rotating palette at
//! registration time. Colors are purely cosmetic and carry no identity.

/// ANSI escape sequence for one palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(&'static str);

/// Returns the terminal to its default color
pub const RESET: &str = "\x1b[00m";

/// Fixed palette, cycled through in order as sessions register
pub const PALETTE: [Color; 6] = [
    Color("\x1b[96m"), // teal
    Color("\x1b[91m"), // red
    Color("\x1b[92m"), // green
    Color("\x1b[93m"), // yellow
    Color("\x1b[94m"), // blue
    Color("\x1b[95m"), // purple
];

impl Color {
    /// The raw escape sequence
    pub fn code(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
