//! pirover-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does pirover-client do? (for beginners)
//!
//! The PiRover is a small vehicle driven over the network.  The *client* is
//! the operator's side: it turns arrow-key presses into drive commands.
//!
//! The client:
//!
//! 1. Connects to the rover over TCP and proves it knows the shared password
//!    (a salted MD5 challenge-response).
//! 2. Watches the four arrow keys.  Keyboard auto-repeat produces a storm of
//!    release/press pairs while a key is held; the debouncer collapses each
//!    hold into exactly one `pressed` and one `released` command.
//! 3. Sends `Keep alive` once a second so the rover knows the operator is
//!    still connected.
//! 4. Tears everything down exactly once when the operator disconnects or
//!    the connection breaks.

/// Application layer: debouncing and heartbeat use cases.
pub mod application;

/// Infrastructure layer: network, session, configuration, and key input.
pub mod infrastructure;
