//! HandshakeClient: connection bring-up and authentication.
//!
//! # Handshake steps
//!
//! ```text
//! 1. TCP connect to host:port                    -> Unreachable on failure
//! 2. send "Hello PiRover!", read one reply       -> NotAPiRoverServer if it
//!                                                   is not a greeting
//! 3. take the salt from the greeting
//! 4. send md5_hex(password ++ salt) + "\n"
//! 5. read one reply; exactly "OK\n" succeeds     -> AuthFailed otherwise
//! ```
//!
//! Every connect, read, and write is bounded by [`HANDSHAKE_TIMEOUT`].  There
//! are no retries: the first failing step aborts the attempt and the socket is
//! dropped (and therefore closed) before the error is returned.
//!
//! The two replies are each read with a single receive of up to
//! [`RECV_BUFFER_SIZE`] bytes.  The rover sends each reply in one write and the
//! protocol has no other framing, so this is the documented contract.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use pirover_core::{
    auth_digest, decode_auth_reply, decode_greeting, encode_message,
    protocol::messages::RECV_BUFFER_SIZE, AuthReply, ClientMessage, ConnectionParameters,
    Greeting, Message, ProtocolError,
};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::{debug, info, warn};

/// Upper bound for every blocking step of the handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a connection attempt failed.  Every variant is terminal for the attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The TCP connection could not be established (refused, timed out, DNS
    /// failure), or the peer vanished while the client was writing.
    #[error("unable to reach {addr}: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Something answered, but not with a PiRover greeting.
    #[error("something responded, but it doesn't seem to be a PiRover server: {0}")]
    NotAPiRoverServer(#[source] ProtocolError),
    /// The rover did not accept the password.
    #[error("authentication with PiRover failed, invalid password?")]
    AuthFailed,
}

/// Progress of a handshake, reported as each phase begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Opening the TCP connection.
    Connecting,
    /// Connected; exchanging greeting and credentials.
    Authenticating,
}

/// A TCP connection that completed the handshake.
#[derive(Debug)]
pub struct AuthenticatedConnection {
    stream: TcpStream,
    peer: SocketAddr,
    greeting: Greeting,
}

impl AuthenticatedConnection {
    /// The rover's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The greeting the rover sent, including its protocol version.
    pub fn greeting(&self) -> &Greeting {
        &self.greeting
    }

    /// Hands the authenticated stream to its new owner.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

/// Runs the connect + authenticate sequence.
#[derive(Debug, Clone)]
pub struct HandshakeClient {
    timeout: Duration,
}

impl Default for HandshakeClient {
    fn default() -> Self {
        Self::new(HANDSHAKE_TIMEOUT)
    }
}

impl HandshakeClient {
    /// Creates a client that bounds every step by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Connects to the rover described by `params` and authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] for the first step that fails.
    pub async fn connect(
        &self,
        params: ConnectionParameters,
    ) -> Result<AuthenticatedConnection, ConnectError> {
        self.connect_observed(params, |_| {}).await
    }

    /// Same as [`HandshakeClient::connect`], calling `on_phase` as each phase
    /// begins.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] for the first step that fails.
    pub async fn connect_observed(
        &self,
        params: ConnectionParameters,
        mut on_phase: impl FnMut(HandshakePhase),
    ) -> Result<AuthenticatedConnection, ConnectError> {
        let addr = params.address();

        // ── 1. TCP connect ────────────────────────────────────────────────────
        on_phase(HandshakePhase::Connecting);
        info!(%addr, "connecting to rover");
        let mut stream = bounded(
            self.timeout,
            TcpStream::connect((params.host.as_str(), params.port)),
        )
        .await
        .map_err(|source| {
            warn!(%addr, "connect failed: {source}");
            ConnectError::Unreachable {
                addr: addr.clone(),
                source,
            }
        })?;
        let peer = stream.peer_addr().map_err(|source| ConnectError::Unreachable {
            addr: addr.clone(),
            source,
        })?;

        // ── 2. Greeting exchange ──────────────────────────────────────────────
        on_phase(HandshakePhase::Authenticating);
        self.write(&mut stream, &encode_message(&ClientMessage::Hello), &addr)
            .await?;
        let reply = self.read_reply(&mut stream).await.map_err(|e| {
            warn!(%addr, "no greeting received: {e}");
            ConnectError::NotAPiRoverServer(ProtocolError::NoReply(e.to_string()))
        })?;

        // ── 3. Salt ───────────────────────────────────────────────────────────
        let greeting = decode_greeting(&reply).map_err(|e| {
            warn!(%addr, "invalid greeting: {e}");
            ConnectError::NotAPiRoverServer(e)
        })?;
        debug!(
            major = greeting.major,
            minor = greeting.minor,
            salt = %greeting.salt,
            "greeting received"
        );

        // ── 4. Credentials ────────────────────────────────────────────────────
        let digest = auth_digest(&params.password, &greeting.salt);
        self.write(
            &mut stream,
            &encode_message(&ClientMessage::AuthResponse { digest }),
            &addr,
        )
        .await?;

        // ── 5. Verdict ────────────────────────────────────────────────────────
        let verdict = match self.read_reply(&mut stream).await {
            Ok(reply) => decode_auth_reply(&reply),
            Err(e) => {
                warn!(%addr, "no authentication reply: {e}");
                AuthReply::Rejected
            }
        };
        if verdict == AuthReply::Rejected {
            warn!(%addr, "authentication rejected");
            return Err(ConnectError::AuthFailed);
        }

        info!(
            %addr,
            %peer,
            major = greeting.major,
            minor = greeting.minor,
            "connection established"
        );
        Ok(AuthenticatedConnection {
            stream,
            peer,
            greeting,
        })
    }

    async fn write(
        &self,
        stream: &mut TcpStream,
        message: &Message,
        addr: &str,
    ) -> Result<(), ConnectError> {
        bounded(self.timeout, stream.write_all(message.as_bytes()))
            .await
            .map_err(|source| ConnectError::Unreachable {
                addr: addr.to_string(),
                source,
            })
    }

    /// One receive of at most [`RECV_BUFFER_SIZE`] bytes.
    async fn read_reply(&self, stream: &mut TcpStream) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let n = bounded(self.timeout, stream.read(&mut buf)).await?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Runs `op` with a deadline, turning an elapsed deadline into
/// [`io::ErrorKind::TimedOut`].
async fn bounded<T>(limit: Duration, op: impl Future<Output = io::Result<T>>) -> io::Result<T> {
    time::timeout(limit, op).await.map_err(io::Error::from)?
}

// ── Tests ─────────────────────────────────────────────────────────────────────
