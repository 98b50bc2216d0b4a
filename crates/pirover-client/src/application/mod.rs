//! Application layer use cases for the client.
//!
//! # What use cases does the client have?
//!
//! - **`debounce`** – Turns the raw press/release edges delivered by the
//!   control window into one `pressed` and one `released` transition per
//!   physical hold, filtering out OS auto-repeat.  Transitions are handed to
//!   a `TransitionSink` injected at construction time.
//!
//! - **`heartbeat`** – Sends `Keep alive` once per second for the lifetime of
//!   the session through a `MessageSink`, so the rover knows the operator is
//!   still connected.
//!
//! Neither module touches a socket directly.  The network layer provides the
//! sink implementations, which keeps both state machines testable with a
//! paused clock and an in-memory sink.

pub mod debounce;
pub mod heartbeat;
