//! Domain types for the PiRover client.
//!
//! This module contains plain data with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application is the **domain**.  Domain code has
//! no imports from OS APIs, network libraries, or UI frameworks, so it can be
//! compiled and tested anywhere without setup.  Outer layers (the debouncer,
//! the network session, the binary) depend on these types, but these types
//! never depend on them.

/// Directional keys, raw edges, and debounced transitions.
pub mod keys;

/// The immutable parameters used to open one connection.
pub mod params;
