//! Authentication digest for the greeting challenge.
//!
//! The deployed rover server checks `md5(password ++ salt)` rendered as
//! lowercase hex.  MD5 is a legacy hash with known collision weaknesses; it is
//! used here only because the server compares against exactly this value, and
//! changing it would break every existing rover.

use md5::{Digest, Md5};

/// Computes the lowercase-hex digest the rover expects for `password ++ salt`.
///
/// # Examples
///
/// ```rust
/// use pirover_core::auth_digest;
///
/// assert_eq!(auth_digest("secret", "12345"), "d4047d3e56e6d6d63f7d16b85cd2fa88");
/// ```
pub fn auth_digest(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
