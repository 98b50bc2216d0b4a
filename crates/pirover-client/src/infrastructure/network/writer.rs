//! SessionWriter: the single entry point for writing to the rover socket.
//!
//! Up to five producers want to write at the same time: four debouncers and
//! the heartbeat.  The writer owns the stream behind an async mutex and holds
//! the lock for exactly one `write_all` + `flush`, so every message reaches
//! the wire whole and unbroken.  No ordering is imposed between producers
//! beyond the order in which their `send` calls acquire the lock.

use std::io;

use async_trait::async_trait;
use pirover_core::Message;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};
use tracing::{debug, info, warn};

use crate::application::heartbeat::MessageSink;

/// Serialises concurrent writes onto one stream.
///
/// Generic over the stream so tests can use an in-memory pipe; sessions use
/// [`TcpStream`].
pub struct SessionWriter<W = TcpStream> {
    stream: Mutex<Option<W>>,
}

impl<W> SessionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Takes ownership of `stream`.  Nothing else may write to it.
    pub fn new(stream: W) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
        }
    }

    /// Writes one complete message.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the write fails, or
    /// [`io::ErrorKind::NotConnected`] once the writer has been closed.  Nothing
    /// is retried.
    pub async fn send(&self, message: &Message) -> io::Result<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "session writer is closed")
        })?;
        stream.write_all(message.as_bytes()).await?;
        stream.flush().await?;
        debug!(message = %message, "sent");
        Ok(())
    }

    /// Shuts the stream down and releases it.
    ///
    /// Waits for an in-flight `send` to finish first.  Returns `true` if this
    /// call closed the stream and `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let stream = self.stream.lock().await.take();
        match stream {
            Some(mut stream) => {
                if let Err(e) = stream.shutdown().await {
                    warn!("error shutting down connection: {e}");
                }
                info!("connection closed");
                true
            }
            None => false,
        }
    }

    /// Whether [`SessionWriter::close`] has run.
    pub async fn is_closed(&self) -> bool {
        self.stream.lock().await.is_none()
    }
}

#[async_trait]
impl<W> MessageSink for SessionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &Message) -> io::Result<()> {
        SessionWriter::send(self, message).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
