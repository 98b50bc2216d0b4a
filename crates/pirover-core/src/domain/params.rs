//! Parameters for opening one connection to a rover.

use std::fmt;

/// Everything needed to open and authenticate one rover connection.
///
/// Produced by the presentation layer after its own input validation and
/// consumed exactly once by the handshake.  The core performs no further
/// validation: an unreachable host or a wrong password surface naturally as
/// handshake errors.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// Host name or IP address of the rover.
    pub host: String,
    /// TCP port of the rover's control server (1–65535).
    pub port: u16,
    /// Shared secret combined with the server's salt during authentication.
    pub password: String,
    /// Whether the operator asked for the video stream to be recorded.
    pub record_video: bool,
}

impl ConnectionParameters {
    /// Creates a new parameter set.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        record_video: bool,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            record_video,
        }
    }

    /// `host:port` as shown in log lines and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// The password must never reach a log line, so `Debug` is written by hand.
impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("record_video", &self.record_video)
            .finish()
    }
}
