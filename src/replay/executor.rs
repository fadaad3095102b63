//! The repeated execution loop.

use crate::client::{Client, DeviceHandle, ExecutionConfig, ProgramHandle};
use crate::replay::{ReplayError, ReplayOptions};
use crate::tensor::TensorValue;
use crate::trace;

/// Run the program `num_runs` times, strictly sequentially, and return
/// the final run's result. Intermediate results are dropped as soon as
/// the next run produces one; with `print_result` off no result is ever
/// materialized. The first backend failure aborts the remaining runs.
pub fn run_repeated(
    client: &dyn Client,
    program: &ProgramHandle,
    args: &[DeviceHandle],
    opts: &ReplayOptions,
) -> Result<Option<TensorValue>, ReplayError> {
    let mut result = None;
    for run in 0..opts.num_runs {
        let mut config = ExecutionConfig::default();
        if opts.profile_last_run && run + 1 == opts.num_runs {
            config.detailed_profile = true;
        }

        let profile = if opts.print_result {
            let (value, profile) = client
                .execute_and_fetch(program, args, &config)
                .map_err(|cause| ReplayError::Execution { run, cause })?;
            result = Some(value);
            profile
        } else {
            // Skipping the fetch avoids the result transfer entirely.
            client
                .execute(program, args, &config)
                .map_err(|cause| ReplayError::Execution { run, cause })?
        };
        trace!(
            "run {} took {:.6}s",
            run,
            profile.compute_time.as_secs_f64()
        );
    }
    Ok(result)
}
