//! All PiRover protocol message types.
//!
//! The protocol is plain ASCII over a raw TCP stream, one message per line:
//!
//! ```text
//! client                                   rover
//! ──────                                   ─────
//! "Hello PiRover!"               ───────>            (no trailing newline)
//!                                <───────  "PiRover 1.0 here! 12345"
//! "<md5 hex of password+salt>\n" ───────>
//!                                <───────  "OK\n"    (anything else = rejected)
//! "Keep alive\n"                 ───────>            (every second)
//! "UP pressed\n" / "UP released\n" ─────>            (debounced arrow keys)
//! ```
//!
//! There is no length prefix and no TLS.  Both server replies are read with a
//! single receive of at most [`RECV_BUFFER_SIZE`] bytes.

use std::fmt;

use crate::domain::keys::{KeyId, KeyTransition};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Session open request.  Sent without a trailing newline.
pub const GREETING_REQUEST: &str = "Hello PiRover!";

/// Literal prefix of the rover's greeting, before the version number.
pub const GREETING_PREFIX: &str = "PiRover ";

/// Literal text between the version number and the salt in the greeting.
pub const GREETING_SALT_MARKER: &str = " here! ";

/// The exact reply that signals successful authentication.
pub const AUTH_OK: &[u8] = b"OK\n";

/// Heartbeat line.
pub const HEARTBEAT: &str = "Keep alive\n";

/// Maximum number of bytes read for each handshake reply.
pub const RECV_BUFFER_SIZE: usize = 256;

/// Port the rover's control server listens on by default.
pub const DEFAULT_PORT: u16 = 1987;

// ── Inbound messages ──────────────────────────────────────────────────────────

/// The rover's greeting, which doubles as the authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Major protocol version announced by the rover, saturated at
    /// `u32::MAX`.  Informational only.
    pub major: u32,
    /// Minor protocol version announced by the rover.
    pub minor: u32,
    /// Numeric nonce (integer or decimal) that must be appended to the
    /// password before hashing.  Kept as text so it is hashed byte-for-byte
    /// as the rover sent it.
    pub salt: String,
}

/// The rover's verdict on the authentication response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReply {
    Accepted,
    Rejected,
}

// ── Outbound messages ─────────────────────────────────────────────────────────

/// Every message the client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `Hello PiRover!` – opens the session.
    Hello,
    /// `<hex digest>\n` – answer to the greeting's challenge.
    AuthResponse { digest: String },
    /// `<KEY> pressed\n` / `<KEY> released\n`.
    KeyCommand {
        key: KeyId,
        transition: KeyTransition,
    },
    /// `Keep alive\n`.
    KeepAlive,
}

/// An encoded outbound line, ready to be written to the socket as-is.
///
/// Immutable once constructed; the only way to build one is through
/// [`crate::protocol::codec::encode_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    /// The full text including any trailing newline.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The text without its trailing newline, for log lines.
    pub fn line(&self) -> &str {
        self.0.trim_end_matches('\n')
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.line())
    }
}
