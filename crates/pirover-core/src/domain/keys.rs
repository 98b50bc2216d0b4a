//! Directional keys and the edges/transitions that flow through the client.
//!
//! # Edges vs. transitions (for beginners)
//!
//! The operating system reports a key as a series of *edges*: a press edge
//! when the key goes down and a release edge when it comes up.  While a key
//! is held, most systems also generate *auto-repeat* edges: a rapid
//! release-then-press pair every few tens of milliseconds.
//!
//! The rover only wants to hear about *logical transitions*: one `pressed`
//! when the operator starts holding a key and one `released` when they let
//! go.  [`Edge`] is what the GUI delivers; [`KeyTransition`] is what the
//! debouncer emits after filtering out auto-repeat noise.

use std::fmt;

/// One of the four directional keys the rover understands.
///
/// The set is fixed and closed: any other key pressed in the control window
/// is never forwarded into the client core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyId {
    Up,
    Down,
    Left,
    Right,
}

impl KeyId {
    /// All tracked keys, in a stable order matching [`KeyId::index`].
    pub const ALL: [KeyId; 4] = [KeyId::Up, KeyId::Down, KeyId::Left, KeyId::Right];

    /// Upper-case name used on the wire (`UP`, `DOWN`, `LEFT`, `RIGHT`).
    pub fn wire_name(self) -> &'static str {
        match self {
            KeyId::Up => "UP",
            KeyId::Down => "DOWN",
            KeyId::Left => "LEFT",
            KeyId::Right => "RIGHT",
        }
    }

    /// Position of this key inside [`KeyId::ALL`].
    ///
    /// Lets callers keep per-key state in a fixed-size array instead of a map.
    pub fn index(self) -> usize {
        match self {
            KeyId::Up => 0,
            KeyId::Down => 1,
            KeyId::Left => 2,
            KeyId::Right => 3,
        }
    }

    /// Parses a key name case-insensitively (`"up"`, `"Left"`, `"RIGHT"`).
    ///
    /// Returns `None` for anything that is not one of the four arrow keys, so
    /// that key sources can drop unrelated keys without treating them as
    /// errors.
    pub fn from_name(name: &str) -> Option<Self> {
        KeyId::ALL
            .into_iter()
            .find(|key| key.wire_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A raw press or release notification for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Press,
    Release,
}

impl Edge {
    /// Parses `press`/`pressed`/`down` and `release`/`released`/`up`,
    /// ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "press" | "pressed" | "down" => Some(Edge::Press),
            "release" | "released" | "up" => Some(Edge::Release),
            _ => None,
        }
    }
}

/// A debounced, auto-repeat-filtered change of a key's logical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    Pressed,
    Released,
}

impl KeyTransition {
    /// Lower-case verb used on the wire (`pressed` / `released`).
    pub fn wire_name(self) -> &'static str {
        match self {
            KeyTransition::Pressed => "pressed",
            KeyTransition::Released => "released",
        }
    }
}

impl fmt::Display for KeyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
