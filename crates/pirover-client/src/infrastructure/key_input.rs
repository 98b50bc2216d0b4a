//! Line-oriented key source for the terminal client.
//!
//! Each input line names a key and an edge:
//!
//! ```text
//! up press
//! up release
//! LEFT pressed
//! quit
//! ```
//!
//! Matching is case-insensitive.  Lines naming anything other than the four
//! arrow keys are ignored, the same way the control window ignores keys it
//! does not track.  `quit` (or end of input) ends the session.

use std::io::{self, BufRead};

use pirover_core::{Edge, KeyId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Queue depth between the reader thread and the session loop.
const CHANNEL_CAPACITY: usize = 64;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A raw press or release of a tracked key.
    Edge(KeyId, Edge),
    /// The operator asked to disconnect.
    Quit,
}

/// Parses one line.  Returns `None` for blank lines, untracked keys, and
/// anything else that is not understood.
pub fn parse_key_line(line: &str) -> Option<KeyInput> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if first.eq_ignore_ascii_case("quit") || first.eq_ignore_ascii_case("exit") {
        return Some(KeyInput::Quit);
    }
    let key = KeyId::from_name(first)?;
    let edge = Edge::from_name(words.next()?)?;
    if words.next().is_some() {
        return None;
    }
    Some(KeyInput::Edge(key, edge))
}

/// Reads key lines from standard input on a dedicated thread.
///
/// # Errors
///
/// Returns an error if the reader thread cannot be spawned.
pub fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<KeyInput>> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}

/// Reads key lines from `reader` on a dedicated OS thread.
///
/// Reads block, so they stay off the async runtime: the thread is detached
/// and a read that never returns does not hold up runtime shutdown or
/// process exit.  The channel closes at end of input, on a read error, or
/// after `quit`.
///
/// # Errors
///
/// Returns an error if the reader thread cannot be spawned.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<KeyInput>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    std::thread::Builder::new()
        .name("pirover-keys".to_string())
        .spawn(move || read_lines(reader, tx))?;
    Ok(rx)
}

fn read_lines<R: BufRead>(reader: R, tx: mpsc::Sender<KeyInput>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("error reading key input: {e}");
                break;
            }
        };
        let Some(input) = parse_key_line(&line) else {
            debug!(line = %line.trim(), "ignored input line");
            continue;
        };
        // A closed receiver means the session loop has gone away.
        if tx.blocking_send(input).is_err() || input == KeyInput::Quit {
            break;
        }
    }
    debug!("key reader stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
