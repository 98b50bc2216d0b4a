//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module handles:
//!
//! - Locating the TOML configuration file (command line, environment, or the
//!   working directory).
//! - Providing sensible defaults when the file does not exist.
//! - Validating the host and port before they become
//!   [`pirover_core::ConnectionParameters`].
//!
//! The file is only ever read.  Nothing in the client writes settings back.

pub mod config;
