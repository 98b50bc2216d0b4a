//! # pirover-core
//!
//! Shared library for the PiRover remote-control client containing the
//! line-oriented wire codec, the authentication digest, and the domain types
//! that describe keys, key edges, and connection parameters.
//!
//! It has zero dependencies on sockets, timers, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! A PiRover is a small remote-controlled vehicle that runs a TCP server.  The
//! client opens one TCP connection, proves that it knows a shared password,
//! and then streams two kinds of text lines to the rover for as long as the
//! session lasts:
//!
//! - `Keep alive` heartbeats, once per second, so the rover knows the
//!   operator is still connected.
//! - `<KEY> pressed` / `<KEY> released` commands for the four arrow keys.
//!
//! This crate (`pirover-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How text travels over the wire: the greeting exchange,
//!   the authentication reply, and the outbound command lines.
//!
//! - **`domain`** – Pure data with no I/O: the closed set of directional
//!   keys, press/release edges, debounced transitions, and the parameters
//!   needed to open a connection.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `pirover_core::KeyId` instead of `pirover_core::domain::keys::KeyId`.
pub use domain::keys::{Edge, KeyId, KeyTransition};
pub use domain::params::ConnectionParameters;
pub use protocol::auth::auth_digest;
pub use protocol::codec::{decode_auth_reply, decode_greeting, encode_message, ProtocolError};
pub use protocol::messages::{AuthReply, ClientMessage, Greeting, Message};
