//! Debouncer: turns raw press/release edges into logical key transitions.
//!
//! # Why debounce? (for beginners)
//!
//! When an arrow key is held down, the operating system does not simply
//! report "pressed" once.  It reports a press, then, at the auto-repeat rate,
//! a rapid *release-then-press* pair over and over, and finally the real
//! release.  Forwarding those edges as-is would make the rover stutter.
//!
//! The debouncer delays every release by [`SINGLE_PRESS_MAX`].  If a press
//! arrives inside that window, the release was auto-repeat noise and both
//! edges are swallowed.  If the window expires quietly, the key really was
//! let go and a single `released` transition is emitted.
//!
//! ```text
//!            Press                        Release (arm timer)
//!  Released ───────> Pressed  ──────────────────────────────┐
//!     ^     emit       ^  │                                  │
//!     │   "pressed"    │  │ Press (cancel timer, no emit)    │
//!     │                └──┘                                  │
//!     └──────────── timer expires: emit "released" <─────────┘
//! ```
//!
//! # Concurrency
//!
//! Each [`Debouncer`] owns the state of one key behind an async mutex.  The
//! task delivering edges and the timer task for that key both take the lock
//! before touching the state *and* hold it while the transition callback
//! runs, so callbacks for one key never overlap.  Different keys share
//! nothing and never wait on each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pirover_core::{Edge, KeyId, KeyTransition};
use tokio::{sync::Mutex, task::JoinHandle, time};
use tracing::{debug, trace};

/// Longest gap between an auto-repeat release and the following re-press.
///
/// A release that is not followed by a press within this window is treated
/// as the real end of the hold.
pub const SINGLE_PRESS_MAX: Duration = Duration::from_millis(50);

/// Receives the logical transitions produced by a [`Debouncer`].
///
/// Implementations are awaited while the key's lock is held, so a slow sink
/// delays further edges for that key only.
#[async_trait]
pub trait TransitionSink: Send + Sync {
    /// Called once per logical press and once per logical release.
    async fn key_transition(&self, key: KeyId, transition: KeyTransition);
}

/// One-shot timer that delivers the delayed release.
///
/// `generation` changes on every arm and cancel, so a timer task that lost
/// the race against a cancel can recognise that it is stale.
#[derive(Default)]
struct ReleaseTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl ReleaseTimer {
    /// Reserves a fresh generation for a timer about to be scheduled.
    fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    fn schedule(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    /// Cancels the pending timer.  Returns `true` if one was armed.
    fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                self.generation = self.generation.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Forgets the handle of a timer that is firing right now.
    fn fired(&mut self) {
        self.handle = None;
    }
}

/// Per-key state, mutated only by edges and by this key's timer.
#[derive(Default)]
struct KeyState {
    logical_pressed: bool,
    pending_release: ReleaseTimer,
    shut_down: bool,
}

struct DebouncerInner {
    key: KeyId,
    window: Duration,
    state: Mutex<KeyState>,
    sink: Arc<dyn TransitionSink>,
    /// Set when the owning [`Debouncer`] is dropped, without taking the lock.
    dropped: AtomicBool,
}

impl DebouncerInner {
    /// Timer expiry: the release was real.
    async fn expire(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if self.dropped.load(Ordering::Acquire) {
            trace!(key = ?self.key, "release timer fired after drop");
            return;
        }
        if state.shut_down || !state.pending_release.is_current(generation) {
            trace!(key = ?self.key, "stale release timer ignored");
            return;
        }
        state.pending_release.fired();
        state.logical_pressed = false;
        debug!(key = ?self.key, "key released");
        self.sink
            .key_transition(self.key, KeyTransition::Released)
            .await;
    }
}

/// Debounce state machine for a single key.
pub struct Debouncer {
    inner: Arc<DebouncerInner>,
}

impl Debouncer {
    /// Creates a debouncer for `key` that reports to `sink`, treating releases
    /// followed by a press within `window` as auto-repeat.
    pub fn new(key: KeyId, window: Duration, sink: Arc<dyn TransitionSink>) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                key,
                window,
                state: Mutex::new(KeyState::default()),
                sink,
                dropped: AtomicBool::new(false),
            }),
        }
    }

    /// The key this debouncer tracks.
    pub fn key(&self) -> KeyId {
        self.inner.key
    }

    /// Feeds one raw edge into the state machine.
    ///
    /// A press that starts a hold invokes the sink before this returns.
    /// Releases never emit directly; they arm the release timer.
    pub async fn on_edge(&self, edge: Edge) {
        let mut state = self.inner.state.lock().await;
        if state.shut_down {
            trace!(key = ?self.inner.key, ?edge, "edge after shutdown ignored");
            return;
        }
        match edge {
            Edge::Press => self.press(&mut state).await,
            Edge::Release => self.release(&mut state),
        }
    }

    async fn press(&self, state: &mut KeyState) {
        let suppressed = state.pending_release.cancel();
        if state.logical_pressed {
            if suppressed {
                trace!(key = ?self.inner.key, "auto-repeat suppressed");
            }
            return;
        }
        state.logical_pressed = true;
        debug!(key = ?self.inner.key, "key pressed");
        self.inner
            .sink
            .key_transition(self.inner.key, KeyTransition::Pressed)
            .await;
    }

    fn release(&self, state: &mut KeyState) {
        if !state.logical_pressed {
            trace!(key = ?self.inner.key, "release while released ignored");
            return;
        }
        // A second release without a press in between restarts the window.
        state.pending_release.cancel();

        let generation = state.pending_release.next_generation();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            time::sleep(inner.window).await;
            inner.expire(generation).await;
        });
        state.pending_release.schedule(handle);
    }

    /// Whether the key is currently logically pressed.
    pub async fn is_pressed(&self) -> bool {
        self.inner.state.lock().await.logical_pressed
    }

    /// Cancels any pending release timer and ignores all further edges.
    ///
    /// Waits for an in-flight transition callback to finish.  No callback is
    /// issued after this returns, not even a `released` for a held key.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        state.shut_down = true;
        if state.pending_release.cancel() {
            debug!(key = ?self.inner.key, "pending release cancelled");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Timer tasks hold their own reference to the inner state, so they
        // would outlive the debouncer unless stopped here.  The flag covers
        // the case where the lock is busy and the timer cannot be aborted.
        self.inner.dropped.store(true, Ordering::Release);
        if let Ok(mut state) = self.inner.state.try_lock() {
            state.shut_down = true;
            state.pending_release.cancel();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
