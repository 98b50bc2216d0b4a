//! Protocol module containing message types, the line codec, and the
//! authentication digest.

pub mod auth;
pub mod codec;
pub mod messages;

pub use auth::auth_digest;
pub use codec::{decode_auth_reply, decode_greeting, encode_message, ProtocolError};
pub use messages::*;
