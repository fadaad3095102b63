//! Backend client interface.
//!
//! The replay core drives an execution backend exclusively through the
//! [`Client`] trait: load a program, move values to device memory, push
//! values into the streaming infeed channel, and execute. The client is
//! shared for a whole batch invocation and must be callable from the
//! infeed worker's thread concurrently with the execution loop.

mod host;
mod ops;

use std::time::Duration;

use anyhow::Result;

use crate::graph::ProgramGraph;
use crate::shape::Shape;
use crate::tensor::TensorValue;

pub use host::HostClient;

/// Opaque handle to a program accepted by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle {
    pub(crate) id: u64,
}

/// Opaque reference to a value materialized in backend memory. The
/// backend owns the underlying buffer; the handle only names it.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    pub(crate) id: u64,
    shape: Shape,
}

impl DeviceHandle {
    pub(crate) fn new(id: u64, shape: Shape) -> Self {
        Self { id, shape }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Per-run execution configuration. Built fresh for every run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Emit per-node timing trace lines while executing.
    pub detailed_profile: bool,
}

/// Timing record produced by one execution run.
#[derive(Debug, Clone)]
pub struct ExecutionProfile {
    pub compute_time: Duration,
}

pub trait Client: Send + Sync {
    /// Validate and accept a program, returning an executable handle.
    fn load_program(&self, program: &ProgramGraph) -> Result<ProgramHandle>;

    /// Materialize a value in backend memory.
    fn transfer_to_device(&self, value: &TensorValue) -> Result<DeviceHandle>;

    /// Push one value into the streaming infeed channel. Blocks until
    /// the channel accepts the value; pushes are ordered per caller.
    fn transfer_to_infeed(&self, value: &TensorValue) -> Result<()>;

    /// Run the program without materializing its result.
    fn execute(
        &self,
        program: &ProgramHandle,
        args: &[DeviceHandle],
        config: &ExecutionConfig,
    ) -> Result<ExecutionProfile>;

    /// Run the program and fetch the result value back to the host.
    fn execute_and_fetch(
        &self,
        program: &ProgramHandle,
        args: &[DeviceHandle],
        config: &ExecutionConfig,
    ) -> Result<(TensorValue, ExecutionProfile)>;
}
