//! Streaming infeed coordination.
//!
//! Decides whether a replay needs a streaming infeed and, when it does,
//! runs exactly one background worker that pushes synthetic values into
//! the channel concurrently with the execution loop. The feed is
//! inherently sequential: values must arrive in push order and the
//! channel is bounded, so the worker pool holds a single thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use rayon::ThreadPoolBuilder;

use crate::client::Client;
use crate::fake::fake_value;
use crate::graph::ProgramGraph;
use crate::replay::{InfeedMode, ReplayError};
use crate::shape::Shape;
use crate::{trace, warning};

/// Extra wait after cancellation for a worker to notice the flag.
const CANCEL_GRACE: Duration = Duration::from_millis(200);

/// Decide the infeed shape for one replay. First match wins: an
/// explicit shape, then inference from the program's infeed ops (zero
/// ops means no streaming; more than one is refused rather than guessed
/// among), then no streaming at all.
pub fn resolve_infeed_shape(
    program: &ProgramGraph,
    mode: &InfeedMode,
) -> Result<Option<Shape>, ReplayError> {
    match mode {
        InfeedMode::Explicit(shape) => Ok(Some(shape.clone())),
        InfeedMode::Infer => {
            let mut shapes = program.infeed_shapes();
            match shapes.len() {
                0 => Ok(None),
                1 => {
                    let shape = shapes.remove(0);
                    trace!("inferred infeed shape {}", shape);
                    Ok(Some(shape))
                }
                count => Err(ReplayError::AmbiguousInfeed { count }),
            }
        }
        InfeedMode::None => Ok(None),
    }
}

/// What the worker accomplished before stopping.
#[derive(Debug)]
pub struct FeedReport {
    pub pushed: usize,
    pub error: Option<anyhow::Error>,
}

/// Handle to the single background feed worker. At most one exists per
/// replayed computation.
pub struct FeedWorker {
    cancel: Arc<AtomicBool>,
    done: Receiver<FeedReport>,
    _pool: rayon::ThreadPool,
}

impl FeedWorker {
    /// Launch the worker: generate one synthetic value for the shape and
    /// push it `count` times, in order, honoring channel backpressure.
    pub fn start(
        client: Arc<dyn Client>,
        shape: Shape,
        count: usize,
        seed: u64,
    ) -> Result<Self, ReplayError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(|_| "infeed".to_string())
            .build()
            .map_err(|err| ReplayError::FeedWorker {
                pushed: 0,
                cause: anyhow!("failed to build infeed worker pool: {}", err),
            })?;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || {
            trace!(
                "infeed.start shape={} count={} thread={:?}",
                shape,
                count,
                std::thread::current().id()
            );
            let report = run_feed(client.as_ref(), &shape, count, seed, &flag);
            trace!("infeed.end pushed={}", report.pushed);
            let _ = tx.send(report);
        });
        Ok(Self {
            cancel,
            done: rx,
            _pool: pool,
        })
    }

    /// Wait for the worker, bounded. A worker that is still making
    /// progress gets `timeout` to drain its full push count; only then
    /// is cancellation signaled, stopping it at the next between-push
    /// check. A worker blocked inside a push cannot be interrupted and
    /// is abandoned after a final grace period.
    pub fn finish(self, timeout: Duration) -> Option<FeedReport> {
        if let Ok(report) = self.done.recv_timeout(timeout) {
            return Some(report);
        }
        self.cancel.store(true, Ordering::Relaxed);
        match self.done.recv_timeout(CANCEL_GRACE) {
            Ok(report) => Some(report),
            Err(_) => {
                warning!(
                    "infeed worker did not stop within {:?}; abandoning it",
                    timeout + CANCEL_GRACE
                );
                None
            }
        }
    }
}

fn run_feed(
    client: &dyn Client,
    shape: &Shape,
    count: usize,
    seed: u64,
    cancel: &AtomicBool,
) -> FeedReport {
    // One value generated up front and reused across every push.
    let value = match fake_value(shape, seed) {
        Ok(value) => value,
        Err(err) => {
            return FeedReport {
                pushed: 0,
                error: Some(err),
            }
        }
    };
    // Too many buffered pushes risk unbounded backend memory; too few
    // risk the consuming program hanging. The caller owns that balance
    // through the push count; no flow matching happens here.
    let mut pushed = 0;
    for _ in 0..count {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        match client.transfer_to_infeed(&value) {
            Ok(()) => pushed += 1,
            Err(err) => {
                return FeedReport {
                    pushed,
                    error: Some(err),
                }
            }
        }
    }
    FeedReport {
        pushed,
        error: None,
    }
}
