//! Value provisioning: decide which input values the replayed program
//! receives and materialize them as device handles.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::client::{Client, DeviceHandle};
use crate::fake::fake_value_with_rng;
use crate::replay::{ReplayError, ReplayOptions};
use crate::snapshot::Snapshot;
use crate::trace;

/// Produce one device handle per declared program parameter, in
/// declaration order. With `use_fake_data` every parameter gets a
/// synthetic value and the snapshot's recorded arguments are never
/// consulted; otherwise the recorded arguments are decoded and
/// transferred one by one, and their count must match the declaration.
pub fn provision_arguments(
    client: &dyn Client,
    snapshot: &Snapshot,
    opts: &ReplayOptions,
) -> Result<Vec<DeviceHandle>, ReplayError> {
    let params = &snapshot.program.params;
    let mut handles = Vec::with_capacity(params.len());

    if opts.use_fake_data {
        let mut rng = StdRng::seed_from_u64(opts.fake_seed);
        for (index, param) in params.iter().enumerate() {
            let value = fake_value_with_rng(&mut rng, &param.shape)
                .map_err(|cause| ReplayError::MalformedArgument { index, cause })?;
            let handle = client
                .transfer_to_device(&value)
                .map_err(|cause| ReplayError::ArgumentTransfer { index, cause })?;
            handles.push(handle);
        }
        trace!("provisioned {} synthetic arguments", handles.len());
        return Ok(handles);
    }

    if snapshot.arguments.len() != params.len() {
        return Err(ReplayError::ArgumentCount {
            expected: params.len(),
            recorded: snapshot.arguments.len(),
        });
    }
    for (index, record) in snapshot.arguments.iter().enumerate() {
        let value = record
            .decode()
            .map_err(|cause| ReplayError::MalformedArgument { index, cause })?;
        let handle = client
            .transfer_to_device(&value)
            .map_err(|cause| ReplayError::ArgumentTransfer { index, cause })?;
        handles.push(handle);
    }
    trace!("provisioned {} recorded arguments", handles.len());
    Ok(handles)
}
