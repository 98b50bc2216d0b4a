//! Network infrastructure for the client application.
//!
//! Handles the TCP connection to the rover.
//!
//! Architecture:
//! - [`handshake::HandshakeClient`] opens the connection and authenticates.
//!   It hands back an [`handshake::AuthenticatedConnection`] or a
//!   [`handshake::ConnectError`].
//! - [`writer::SessionWriter`] takes over the authenticated stream and is the
//!   only thing that writes to it afterwards.  Debouncers and the heartbeat all
//!   send through it.
//!
//! The rover never sends anything after the handshake, so there is no read
//! loop once a session is running.

pub mod handshake;
pub mod writer;

pub use handshake::{
    AuthenticatedConnection, ConnectError, HandshakeClient, HandshakePhase, HANDSHAKE_TIMEOUT,
};
pub use writer::SessionWriter;
