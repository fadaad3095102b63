//! Replay orchestration.
//!
//! One call per snapshot: reconstruct the program on the backend,
//! provision its arguments, optionally launch the streaming feed
//! worker, run the execution loop, and hand back the final result.

mod error;
mod executor;
mod infeed;
mod options;
mod provision;
mod report;

use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::snapshot::Snapshot;
use crate::tensor::TensorValue;

pub use error::ReplayError;
pub use executor::run_repeated;
pub use infeed::{resolve_infeed_shape, FeedReport, FeedWorker};
pub use options::{InfeedMode, ReplayOptions};
pub use provision::provision_arguments;
pub use report::render_report;

/// How long the orchestration waits for the feed worker after the last
/// run before abandoning it.
const FEED_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Replay one snapshot against the backend. Returns the final run's
/// result, or `None` when result retrieval was skipped.
pub fn replay_snapshot(
    client: &Arc<dyn Client>,
    snapshot: &Snapshot,
    opts: &ReplayOptions,
) -> Result<Option<TensorValue>, ReplayError> {
    if opts.num_runs == 0 {
        return Err(ReplayError::Options {
            reason: "num_runs must be at least 1".to_string(),
        });
    }

    let program = client
        .load_program(&snapshot.program)
        .map_err(|cause| ReplayError::ProgramLoad { cause })?;
    let args = provision_arguments(client.as_ref(), snapshot, opts)?;

    // The infeed policy is evaluated exactly once, before any run; an
    // ambiguous program fails here, never mid-execution.
    let feeder = match resolve_infeed_shape(&snapshot.program, &opts.infeed)? {
        Some(shape) => Some(FeedWorker::start(
            client.clone(),
            shape,
            opts.num_infeeds,
            opts.fake_seed,
        )?),
        None => None,
    };

    let outcome = run_repeated(client.as_ref(), &program, &args, opts);

    if let Some(feeder) = feeder {
        if let Some(report) = feeder.finish(FEED_JOIN_TIMEOUT) {
            if let Some(cause) = report.error {
                if outcome.is_ok() {
                    // The runs finished but their streamed input was cut
                    // short; the replay was not faithful.
                    return Err(ReplayError::FeedWorker {
                        pushed: report.pushed,
                        cause,
                    });
                }
                crate::error!(
                    "infeed worker failed after {} pushes: {:#}",
                    report.pushed, cause
                );
            }
        }
    }

    outcome
}
