//! HeartbeatScheduler: keeps the rover convinced the operator is still there.
//!
//! The rover stops the vehicle if it stops hearing from the client, so while
//! a session is active the client writes `Keep alive\n` once per
//! [`HEARTBEAT_PERIOD`].  The first heartbeat goes out immediately at
//! [`HeartbeatScheduler::start`]; the loop is *send, then sleep*.
//!
//! There is no backoff or retry.  A failed send is reported on the
//! failure channel and ends the loop, because every later write on a broken
//! connection would fail the same way.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pirover_core::{encode_message, ClientMessage, Message};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

/// Interval between two heartbeats.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

/// Destination for complete outbound lines.
///
/// The network layer's session writer is the production implementation; tests
/// substitute recording or mock sinks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Writes one complete message.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the write fails.
    async fn send(&self, message: &Message) -> io::Result<()>;
}

/// Background task that sends a heartbeat every period until stopped.
pub struct HeartbeatScheduler {
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatScheduler {
    /// Spawns the heartbeat loop and returns a handle to stop it.
    ///
    /// The first heartbeat is sent right away.  If a send fails, the error is
    /// pushed onto `failures` and the loop ends.
    pub fn start(
        sink: Arc<dyn MessageSink>,
        period: Duration,
        failures: mpsc::UnboundedSender<io::Error>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(sink, period, stop_rx, failures));
        info!(?period, "heartbeat started");
        Self {
            stop_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stops the loop and waits for it to finish.
    ///
    /// An in-flight send is allowed to complete; no heartbeat is sent after
    /// this returns.  Safe to call more than once and from any task.
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("heartbeat task ended abnormally: {e}");
            }
            info!("heartbeat stopped");
        }
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

async fn run(
    sink: Arc<dyn MessageSink>,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
    failures: mpsc::UnboundedSender<io::Error>,
) {
    let heartbeat = encode_message(&ClientMessage::KeepAlive);
    loop {
        if *stop_rx.borrow() {
            break;
        }
        debug!("sending heartbeat");
        if let Err(e) = sink.send(&heartbeat).await {
            warn!("heartbeat send failed, stopping heartbeat: {e}");
            let _ = failures.send(e);
            break;
        }
        tokio::select! {
            _ = time::sleep(period) => {}
            _ = stop_rx.changed() => break,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::time::{sleep, Instant};

    /// Records each message with its offset from the moment it was created.
    struct RecordingSink {
        started: Instant,
        sent: StdMutex<Vec<(String, Duration)>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Instant::now(),
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, message: &Message) -> io::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((message.as_str().to_string(), self.started.elapsed()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_heartbeats_in_three_seconds_starting_at_zero() {
        // Arrange
        let sink = RecordingSink::new();
        let (failures, _failures_rx) = mpsc::unbounded_channel();

        // Act
        let heartbeat = HeartbeatScheduler::start(
            Arc::clone(&sink) as Arc<dyn MessageSink>,
            HEARTBEAT_PERIOD,
            failures,
        );
        sleep(Duration::from_millis(2_950)).await;
        heartbeat.stop().await;

        // Assert
        let sent = sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 3, "sent: {sent:?}");
        assert!(sent.iter().all(|(text, _)| text == "Keep alive\n"));
        assert_eq!(sent[0].1, Duration::ZERO, "first heartbeat must not wait");
        assert!(sent[1].1 >= Duration::from_millis(1_000));
        assert!(sent[2].1 >= Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_after_stop_returns() {
        // Arrange
        let sink = RecordingSink::new();
        let (failures, _failures_rx) = mpsc::unbounded_channel();
        let heartbeat = HeartbeatScheduler::start(
            Arc::clone(&sink) as Arc<dyn MessageSink>,
            HEARTBEAT_PERIOD,
            failures,
        );
        sleep(Duration::from_millis(1_500)).await;

        // Act
        heartbeat.stop().await;
        let at_stop = sink.count();
        sleep(Duration::from_secs(5)).await;

        // Assert
        assert_eq!(at_stop, 2);
        assert_eq!(sink.count(), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_another_task() {
        let sink = RecordingSink::new();
        let (failures, _failures_rx) = mpsc::unbounded_channel();
        let heartbeat = Arc::new(HeartbeatScheduler::start(
            Arc::clone(&sink) as Arc<dyn MessageSink>,
            HEARTBEAT_PERIOD,
            failures,
        ));

        let stopper = Arc::clone(&heartbeat);
        tokio::spawn(async move { stopper.stop().await })
            .await
            .unwrap();
        let at_stop = sink.count();
        sleep(Duration::from_secs(3)).await;

        assert_eq!(sink.count(), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_harmless() {
        let sink = RecordingSink::new();
        let (failures, _failures_rx) = mpsc::unbounded_channel();
        let heartbeat = HeartbeatScheduler::start(
            Arc::clone(&sink) as Arc<dyn MessageSink>,
            HEARTBEAT_PERIOD,
            failures,
        );

        heartbeat.stop().await;
        heartbeat.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_reported_and_stops_loop() {
        // Arrange – the mock panics on drop if send is called more than once
        let mut sink = MockMessageSink::new();
        sink.expect_send()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::BrokenPipe)));
        let (failures, mut failures_rx) = mpsc::unbounded_channel();

        // Act
        let heartbeat = HeartbeatScheduler::start(Arc::new(sink), HEARTBEAT_PERIOD, failures);
        let error = failures_rx.recv().await.expect("failure must be reported");
        sleep(Duration::from_secs(3)).await;
        heartbeat.stop().await;

        // Assert
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }
}
