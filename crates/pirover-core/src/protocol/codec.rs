//! Text codec for PiRover protocol messages.
//!
//! Encoding turns a [`ClientMessage`] into the exact line that goes on the
//! wire.  Decoding covers the two replies the rover sends during the
//! handshake: the greeting and the authentication verdict.
//!
//! Greeting grammar (matched from the start of the received bytes; anything
//! after the salt, such as a newline, is ignored):
//! ```text
//! "PiRover " <digits> "." <digits> " here! " <salt>
//! salt := <digits> [ "." <digits> ]      with at least two digits in total
//! ```

use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{
    AuthReply, ClientMessage, Greeting, Message, AUTH_OK, GREETING_PREFIX, GREETING_REQUEST,
    GREETING_SALT_MARKER, HEARTBEAT,
};

/// Errors that can occur while decoding a message from the rover.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The received bytes are not valid UTF-8 text.
    #[error("reply is not valid UTF-8 text")]
    NotUtf8,

    /// The received text does not follow the greeting pattern.
    #[error("unexpected greeting: {0:?}")]
    UnexpectedGreeting(String),

    /// The version number in the greeting is missing.
    #[error("malformed version in greeting: {0:?}")]
    BadVersion(String),

    /// The greeting has no usable salt after the marker.
    #[error("greeting carries no numeric salt")]
    MissingSalt,

    /// Nothing could be read where a reply was expected (timeout, reset).
    #[error("no reply received: {0}")]
    NoReply(String),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a [`ClientMessage`] into the line written to the socket.
///
/// # Examples
///
/// ```rust
/// use pirover_core::{encode_message, ClientMessage, KeyId, KeyTransition};
///
/// let msg = encode_message(&ClientMessage::KeyCommand {
///     key: KeyId::Left,
///     transition: KeyTransition::Pressed,
/// });
/// assert_eq!(msg.as_str(), "LEFT pressed\n");
/// ```
pub fn encode_message(msg: &ClientMessage) -> Message {
    let text = match msg {
        ClientMessage::Hello => GREETING_REQUEST.to_string(),
        ClientMessage::AuthResponse { digest } => format!("{digest}\n"),
        ClientMessage::KeyCommand { key, transition } => {
            format!("{} {}\n", key.wire_name(), transition.wire_name())
        }
        ClientMessage::KeepAlive => HEARTBEAT.to_string(),
    };
    Message::new(text)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes the rover's greeting from the bytes of a single receive.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are not text or do not match the
/// greeting pattern.
///
/// # Examples
///
/// ```rust
/// use pirover_core::decode_greeting;
///
/// let greeting = decode_greeting(b"PiRover 1.0 here! 12345").unwrap();
/// assert_eq!((greeting.major, greeting.minor), (1, 0));
/// assert_eq!(greeting.salt, "12345");
/// ```
pub fn decode_greeting(bytes: &[u8]) -> Result<Greeting, ProtocolError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;

    let rest = text
        .strip_prefix(GREETING_PREFIX)
        .ok_or_else(|| ProtocolError::UnexpectedGreeting(preview(text)))?;

    let (major, rest) = split_digits(rest);
    let rest = rest
        .strip_prefix('.')
        .ok_or_else(|| ProtocolError::BadVersion(preview(text)))?;
    let (minor, rest) = split_digits(rest);
    let major = parse_version_part(major, text)?;
    let minor = parse_version_part(minor, text)?;

    let rest = rest
        .strip_prefix(GREETING_SALT_MARKER)
        .ok_or_else(|| ProtocolError::UnexpectedGreeting(preview(text)))?;
    let salt = take_salt(rest).ok_or(ProtocolError::MissingSalt)?;

    trace!(major, minor, salt, "decoded greeting");
    Ok(Greeting {
        major,
        minor,
        salt: salt.to_string(),
    })
}

/// Decodes the authentication verdict.  Only the exact bytes `OK\n` count as
/// acceptance; everything else, including an empty read, is a rejection.
pub fn decode_auth_reply(bytes: &[u8]) -> AuthReply {
    if bytes == AUTH_OK {
        AuthReply::Accepted
    } else {
        AuthReply::Rejected
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Splits `s` into its leading ASCII-digit run and the remainder.
fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Reads one version field.  Any non-empty digit run is accepted; values past
/// `u32::MAX` saturate since the version is only ever reported.
fn parse_version_part(digits: &str, whole: &str) -> Result<u32, ProtocolError> {
    if digits.is_empty() {
        return Err(ProtocolError::BadVersion(preview(whole)));
    }
    Ok(digits.bytes().fold(0u32, |n, d| {
        n.saturating_mul(10).saturating_add(u32::from(d - b'0'))
    }))
}

/// Extracts the salt from the start of `s`.
///
/// A decimal salt (`123.456`, `1.5`) needs digits on both sides of the dot.
/// An integer salt needs at least two digits.  A dangling dot (`123.`) is
/// left out of the salt.
fn take_salt(s: &str) -> Option<&str> {
    let (int_part, rest) = split_digits(s);
    if int_part.is_empty() {
        return None;
    }
    if let Some(after_dot) = rest.strip_prefix('.') {
        let (frac_part, _) = split_digits(after_dot);
        if !frac_part.is_empty() {
            return Some(&s[..int_part.len() + 1 + frac_part.len()]);
        }
    }
    (int_part.len() >= 2).then_some(int_part)
}

/// Shortened copy of a reply for error messages.
fn preview(text: &str) -> String {
    text.chars().take(64).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
