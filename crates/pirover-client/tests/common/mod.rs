//! In-process stand-ins for the rover, shared by the integration tests.
//!
//! Every stub binds an ephemeral port on 127.0.0.1, serves exactly one
//! client, and reports what it saw on channels so tests can assert on the
//! exact bytes the client sent.

#![allow(dead_code)]

use pirover_core::auth_digest;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

/// Salt handed out by the stubs unless a test picks its own.
pub const SALT: &str = "12345";

/// What a stub rover does once the client has authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterAuth {
    /// Keep reading and forward every line.
    Listen,
    /// Drop the connection straight away.
    HangUp,
}

/// What the stub received during the handshake.
#[derive(Debug)]
pub struct Transcript {
    pub hello: String,
    pub digest_line: String,
}

/// Handles to a running stub rover.
pub struct StubRover {
    pub port: u16,
    pub transcript: mpsc::UnboundedReceiver<Transcript>,
    pub lines: mpsc::UnboundedReceiver<String>,
}

/// Binds a listener on an ephemeral local port.
pub async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Returns a port on which nothing is listening.
pub async fn closed_port() -> u16 {
    let (listener, port) = bind().await;
    drop(listener);
    port
}

async fn read_once(socket: &mut TcpStream) -> String {
    let mut buf = [0u8; 256];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

/// A rover that greets with `salt`, checks the digest against `password`,
/// and answers `OK\n` or `NO\n`.
pub async fn spawn_rover(password: &str, salt: &str, after_auth: AfterAuth) -> StubRover {
    let (listener, port) = bind().await;
    let (transcript_tx, transcript) = mpsc::unbounded_channel();
    let (lines_tx, lines) = mpsc::unbounded_channel();
    let expected = format!("{}\n", auth_digest(password, salt));
    let greeting = format!("PiRover 1.0 here! {salt}\n");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let hello = read_once(&mut socket).await;
        socket.write_all(greeting.as_bytes()).await.unwrap();
        let digest_line = read_once(&mut socket).await;
        let accepted = digest_line == expected;
        let _ = transcript_tx.send(Transcript { hello, digest_line });
        if !accepted {
            let _ = socket.write_all(b"NO\n").await;
            return;
        }
        socket.write_all(b"OK\n").await.unwrap();

        if after_auth == AfterAuth::HangUp {
            return;
        }
        let mut reader = BufReader::new(socket).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    StubRover {
        port,
        transcript,
        lines,
    }
}

/// A server that answers the greeting request with `reply` and hangs up.
pub async fn spawn_foreign_server(reply: &'static [u8]) -> u16 {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_once(&mut socket).await;
        let _ = socket.write_all(reply).await;
    });
    port
}

/// A server that accepts and reads but never answers.  It holds the socket
/// until the client goes away.
pub async fn spawn_silent_server() -> u16 {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });
    port
}

/// A rover that greets correctly but never answers the digest.
pub async fn spawn_mute_after_greeting() -> u16 {
    let (listener, port) = bind().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_once(&mut socket).await;
        socket
            .write_all(format!("PiRover 1.0 here! {SALT}").as_bytes())
            .await
            .unwrap();
        let mut buf = [0u8; 256];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });
    port
}
