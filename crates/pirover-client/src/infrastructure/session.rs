//! Session: one authenticated connection and everything running on it.
//!
//! # What a session owns (for beginners)
//!
//! ```text
//!                       ┌──────────── Session ─────────────┐
//!  on_key_event(UP, …) ─┼─> Debouncer(UP)    ─┐            │
//!                       │   Debouncer(DOWN)  ─┤            │
//!                       │   Debouncer(LEFT)  ─┼─> SessionWriter ──> TCP
//!                       │   Debouncer(RIGHT) ─┤            │
//!                       │   HeartbeatScheduler┘            │
//!                       │                                  │
//!                       │   supervisor <── write failures  │
//!                       └──────────────────────────────────┘
//! ```
//!
//! [`Session::open`] runs the handshake and wires the pieces together.  The
//! caller then feeds raw key edges into [`Session::on_key_event`] and
//! eventually calls [`Session::close`].
//!
//! Producers never tear the session down themselves.  A failed write is sent
//! to a small supervisor task, which reports [`SessionEvent::Failed`] and then
//! runs the same teardown as `close`.
//!
//! # Teardown order
//!
//! 1. stop the heartbeat and wait for its task to end
//! 2. shut down every debouncer (cancels pending release timers and waits for
//!    an in-flight callback)
//! 3. close the socket
//! 4. publish [`SessionState::Closed`] and [`SessionEvent::Closed`]
//!
//! Nothing writes to the socket after step 2, so step 3 never races a sender.

use std::io;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};
use std::time::Duration;

use async_trait::async_trait;
use pirover_core::{
    encode_message, ClientMessage, ConnectionParameters, Edge, KeyId, KeyTransition,
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::application::{
    debounce::{Debouncer, TransitionSink, SINGLE_PRESS_MAX},
    heartbeat::{HeartbeatScheduler, MessageSink, HEARTBEAT_PERIOD},
};
use crate::infrastructure::network::{
    ConnectError, HandshakeClient, HandshakePhase, SessionWriter, HANDSHAKE_TIMEOUT,
};

/// Errors reported by an open session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A write to the rover failed.  The session is torn down afterwards.
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
    /// The session has already been closed.
    #[error("session is closed")]
    Closed,
}

/// Notifications for the presentation layer.
#[derive(Debug)]
pub enum SessionEvent {
    /// The connection broke.  Always followed by [`SessionEvent::Closed`].
    Failed(SessionError),
    /// The session has been torn down.  Sent exactly once.
    Closed,
}

/// Lifecycle of a session.
///
/// `Connecting` and `Authenticating` are reported through
/// [`Session::open_observed`]; a returned [`Session`] is `Active` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Active,
    Closed,
}

/// Timing knobs.  The defaults are the values the rover expects; tests
/// shorten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound for each connect, read, and write of the handshake.
    pub handshake_timeout: Duration,
    /// Interval between heartbeats.
    pub heartbeat_period: Duration,
    /// Auto-repeat suppression window for each key.
    pub single_press_max: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: HANDSHAKE_TIMEOUT,
            heartbeat_period: HEARTBEAT_PERIOD,
            single_press_max: SINGLE_PRESS_MAX,
        }
    }
}

// ── Command sink ──────────────────────────────────────────────────────────────

/// Turns logical transitions into `KEY pressed` / `KEY released` lines.
struct CommandSink {
    writer: Arc<SessionWriter>,
    faults: mpsc::UnboundedSender<io::Error>,
}

#[async_trait]
impl TransitionSink for CommandSink {
    async fn key_transition(&self, key: KeyId, transition: KeyTransition) {
        let message = encode_message(&ClientMessage::KeyCommand { key, transition });
        if let Err(e) = self.writer.send(&message).await {
            warn!(?key, %transition, "command send failed: {e}");
            let _ = self.faults.send(e);
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

struct SessionInner {
    peer: SocketAddr,
    writer: Arc<SessionWriter>,
    debouncers: [Debouncer; 4],
    heartbeat: HeartbeatScheduler,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Set as soon as a teardown starts; new key events are refused.
    closing: AtomicBool,
    /// `true` once teardown has finished.  Held for the whole teardown so a
    /// concurrent `close` waits for it.
    closed: Mutex<bool>,
}

impl SessionInner {
    /// Runs the teardown once.  Returns `false` if it had already run.
    async fn teardown(&self) -> bool {
        self.closing.store(true, Ordering::Release);
        let mut closed = self.closed.lock().await;
        if *closed {
            return false;
        }

        self.heartbeat.stop().await;
        for debouncer in &self.debouncers {
            debouncer.shutdown().await;
        }
        self.writer.close().await;

        *closed = true;
        self.state.send_replace(SessionState::Closed);
        let _ = self.events.send(SessionEvent::Closed);
        info!(peer = %self.peer, "session closed");
        true
    }
}

/// An authenticated, running connection to the rover.
///
/// Dropping a session without calling [`Session::close`] still stops the
/// heartbeat and the release timers, but does not wait for them.
pub struct Session {
    inner: Arc<SessionInner>,
    supervisor: JoinHandle<()>,
}

impl Session {
    /// Connects, authenticates, and starts the heartbeat.
    ///
    /// Returns the session together with the receiver for its
    /// [`SessionEvent`]s.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectError`] of the failed handshake.  No session or
    /// background task exists in that case.
    pub async fn open(
        params: ConnectionParameters,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ConnectError> {
        Self::open_observed(params, config, |_| {}).await
    }

    /// Same as [`Session::open`], calling `on_state` for `Connecting`,
    /// `Authenticating` and `Active` as the session enters them.
    ///
    /// These early states exist only while `open` runs, so this callback is
    /// the only way to see them.  [`Session::state_changes`] starts at
    /// `Active` and afterwards only ever moves to `Closed`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectError`] of the failed handshake.
    pub async fn open_observed(
        params: ConnectionParameters,
        config: SessionConfig,
        mut on_state: impl FnMut(SessionState),
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ConnectError> {
        let (state, _) = watch::channel(SessionState::Connecting);
        let record_video = params.record_video;

        let connection = HandshakeClient::new(config.handshake_timeout)
            .connect_observed(params, |phase| {
                let next = match phase {
                    HandshakePhase::Connecting => SessionState::Connecting,
                    HandshakePhase::Authenticating => SessionState::Authenticating,
                };
                debug!(state = ?next, "session state changed");
                state.send_replace(next);
                on_state(next);
            })
            .await?;

        let peer = connection.peer_addr();
        let writer = Arc::new(SessionWriter::new(connection.into_stream()));
        let (faults_tx, faults_rx) = mpsc::unbounded_channel();

        let commands: Arc<dyn TransitionSink> = Arc::new(CommandSink {
            writer: Arc::clone(&writer),
            faults: faults_tx.clone(),
        });
        let debouncers = KeyId::ALL
            .map(|key| Debouncer::new(key, config.single_press_max, Arc::clone(&commands)));
        let heartbeat = HeartbeatScheduler::start(
            Arc::clone(&writer) as Arc<dyn MessageSink>,
            config.heartbeat_period,
            faults_tx,
        );

        state.send_replace(SessionState::Active);
        on_state(SessionState::Active);
        info!(%peer, record_video, "session active");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            peer,
            writer,
            debouncers,
            heartbeat,
            state,
            events: events_tx,
            closing: AtomicBool::new(false),
            closed: Mutex::new(false),
        });
        let supervisor = tokio::spawn(supervise(Arc::downgrade(&inner), faults_rx));

        Ok((Self { inner, supervisor }, events_rx))
    }

    /// Forwards one raw key edge to that key's debouncer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] once the session is closing or closed.
    /// Write failures are not returned here; they arrive as
    /// [`SessionEvent::Failed`].
    pub async fn on_key_event(&self, key: KeyId, edge: Edge) -> Result<(), SessionError> {
        if self.inner.closing.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        self.inner.debouncers[key.index()].on_edge(edge).await;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Watches lifecycle changes, e.g. to learn when a failed connection has
    /// been torn down.  Observers see `Active` and `Closed` only; use
    /// [`Session::open_observed`] for the handshake states.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The rover's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    /// Stops the heartbeat, cancels all release timers, and closes the socket.
    ///
    /// Returns once everything has stopped.  Calling it again, or concurrently,
    /// is harmless; only the first call does the work.
    pub async fn close(&self) {
        if !self.inner.teardown().await {
            debug!("close on a closed session ignored");
        }
        self.supervisor.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

/// Waits for the first write failure, reports it, and tears the session down.
async fn supervise(inner: Weak<SessionInner>, mut faults: mpsc::UnboundedReceiver<io::Error>) {
    while let Some(fault) = faults.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.closing.load(Ordering::Acquire) {
            // Fallout from a teardown already in progress.
            continue;
        }
        error!(peer = %inner.peer, "connection to rover lost: {fault}");
        let _ = inner.events.send(SessionEvent::Failed(SessionError::Io(fault)));
        inner.teardown().await;
        break;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
        time::timeout,
    };

    const WAIT: Duration = Duration::from_secs(5);

    /// Accepts one client, completes the handshake without checking the
    /// digest, and forwards every later line on the returned channel.
    async fn stub_rover() -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"PiRover 1.0 here! 12345").await.unwrap();
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"OK\n").await.unwrap();

            let mut lines = BufReader::new(socket).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        });
        (port, lines_rx)
    }

    async fn open_session(port: u16) -> (Session, mpsc::UnboundedReceiver<SessionEvent>) {
        let params = ConnectionParameters::new("127.0.0.1", port, "secret", false);
        Session::open(params, SessionConfig::default()).await.unwrap()
    }

    /// Next line from the stub that is not a heartbeat.
    async fn next_command(lines: &mut mpsc::UnboundedReceiver<String>) -> String {
        loop {
            let line = timeout(WAIT, lines.recv()).await.unwrap().unwrap();
            if line != "Keep alive" {
                return line;
            }
        }
    }

    #[test]
    fn test_session_config_default_values() {
        let config = SessionConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.heartbeat_period, Duration::from_secs(1));
        assert_eq!(config.single_press_max, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_open_returns_active_session() {
        // Arrange
        let (port, mut lines) = stub_rover().await;

        // Act
        let (session, _events) = open_session(port).await;

        // Assert
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.peer_addr().port(), port);
        let first = timeout(WAIT, lines.recv()).await.unwrap().unwrap();
        assert_eq!(first, "Keep alive");
        session.close().await;
    }

    #[tokio::test]
    async fn test_key_press_is_sent_as_command() {
        // Arrange
        let (port, mut lines) = stub_rover().await;
        let (session, _events) = open_session(port).await;

        // Act
        session.on_key_event(KeyId::Left, Edge::Press).await.unwrap();

        // Assert
        assert_eq!(next_command(&mut lines).await, "LEFT pressed");
        session.close().await;
    }

    #[tokio::test]
    async fn test_close_twice_emits_one_closed_event() {
        // Arrange
        let (port, _lines) = stub_rover().await;
        let (session, mut events) = open_session(port).await;

        // Act
        session.close().await;
        session.close().await;

        // Assert
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(events.recv().await, Some(SessionEvent::Closed)));
        assert!(events.try_recv().is_err(), "only one Closed event expected");
    }

    #[tokio::test]
    async fn test_key_event_after_close_is_refused() {
        let (port, _lines) = stub_rover().await;
        let (session, _events) = open_session(port).await;

        session.close().await;
        let result = session.on_key_event(KeyId::Up, Edge::Press).await;

        assert!(matches!(result, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn test_close_discards_pending_release() {
        // Arrange – press, then release with a long window so the timer is
        // still armed when the session closes
        let (port, mut lines) = stub_rover().await;
        let params = ConnectionParameters::new("127.0.0.1", port, "secret", false);
        let config = SessionConfig {
            single_press_max: Duration::from_secs(30),
            ..SessionConfig::default()
        };
        let (session, _events) = Session::open(params, config).await.unwrap();
        session.on_key_event(KeyId::Down, Edge::Press).await.unwrap();
        session.on_key_event(KeyId::Down, Edge::Release).await.unwrap();

        // Act
        session.close().await;

        // Assert – the stub sees the press and then end of stream
        assert_eq!(next_command(&mut lines).await, "DOWN pressed");
        while let Ok(Some(line)) = timeout(WAIT, lines.recv()).await {
            assert_eq!(line, "Keep alive", "unexpected line after close");
        }
    }
}
