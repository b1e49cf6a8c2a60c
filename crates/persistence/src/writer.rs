//! Trailing-edge debounced snapshot writer.
//!
//! Every scheduled snapshot replaces the pending one and restarts the timer;
//! the sink sees only the last state of a burst. Shutdown closes the channel
//! and the task flushes whatever is still pending before it exits. Sink
//! writes run on Tokio's blocking pool, off the async workers.

use crate::{PersistenceError, Snapshot, SnapshotSink};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Writer settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistConfig {
    /// Quiet period after the last change before a write.
    pub debounce: Duration,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

/// Counters reported when the writer shuts down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: usize,
    pub failed: usize,
}

/// Handle to the background writer task. Must be created inside a Tokio
/// runtime.
pub struct DebouncedWriter {
    tx: mpsc::UnboundedSender<Snapshot>,
    handle: JoinHandle<WriterStats>,
}

impl DebouncedWriter {
    pub fn spawn<S: SnapshotSink>(sink: S, config: PersistConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(sink, rx, config.debounce));
        Self { tx, handle }
    }

    /// Replace the pending snapshot and restart the quiet-period timer.
    pub fn schedule(&self, snapshot: Snapshot) {
        if self.tx.send(snapshot).is_err() {
            warn!("snapshot writer has stopped; dropping snapshot");
        }
    }

    /// Flush the pending snapshot, if any, and stop the task.
    pub async fn shutdown(self) -> Result<WriterStats, PersistenceError> {
        let DebouncedWriter { tx, handle } = self;
        drop(tx);
        handle
            .await
            .map_err(|e| PersistenceError::Writer(e.to_string()))
    }
}

/// Write on the blocking pool and hand the sink back. An error here means the
/// blocking task itself died and the sink is gone.
async fn flush<S: SnapshotSink>(
    sink: S,
    snapshot: Snapshot,
    stats: &mut WriterStats,
) -> Result<S, PersistenceError> {
    let (sink, result) = tokio::task::spawn_blocking(move || {
        let mut sink = sink;
        let result = sink.write(&snapshot);
        (sink, result)
    })
    .await
    .map_err(|e| PersistenceError::Writer(e.to_string()))?;
    match result {
        Ok(()) => stats.written += 1,
        Err(e) => {
            stats.failed += 1;
            warn!(error = %e, "snapshot write failed");
        }
    }
    Ok(sink)
}

async fn run<S: SnapshotSink>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<Snapshot>,
    debounce: Duration,
) -> WriterStats {
    let mut stats = WriterStats::default();
    let mut pending: Option<Snapshot> = None;
    loop {
        let Some(current) = pending.take() else {
            match rx.recv().await {
                Some(next) => {
                    pending = Some(next);
                    continue;
                }
                None => break,
            }
        };
        let closing = tokio::select! {
            msg = rx.recv() => match msg {
                Some(next) => {
                    pending = Some(next);
                    continue;
                }
                None => true,
            },
            _ = tokio::time::sleep(debounce) => false,
        };
        if closing {
            debug!("writer closing; flushing pending snapshot");
        }
        sink = match flush(sink, current, &mut stats).await {
            Ok(sink) => sink,
            Err(e) => {
                stats.failed += 1;
                warn!(error = %e, "snapshot writer lost its sink; stopping");
                break;
            }
        };
        if closing {
            break;
        }
    }
    stats
}
