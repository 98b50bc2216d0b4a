//! Infrastructure layer for the client application.
//!
//! Contains the adapters that touch the outside world: the TCP connection to
//! the rover, the session that runs on it, the configuration file, and the
//! terminal key source.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pirover_core`, but MUST NOT be imported by the `application` or domain
//! layers.
//!
//! # Sub-modules
//!
//! - **`network`** – Handshake with the rover and the serialising writer that
//!   every producer sends through.
//!
//! - **`session`** – Composes the handshake, one debouncer per key, the
//!   heartbeat, and the writer into one closable unit.
//!
//! - **`storage`** – Read-only TOML configuration with host/port validation.
//!
//! - **`key_input`** – Turns lines such as `up press` into key edges for the
//!   terminal client.

pub mod key_input;
pub mod network;
pub mod session;
pub mod storage;
