//! In-process reference backend.
//!
//! Executes programs on the host CPU. Owns the device buffer table, the
//! loaded program table, and the bounded infeed channel. All methods are
//! callable concurrently; the infeed channel is the only point where the
//! feed worker and the execution loop meet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::client::ops::exec_op;
use crate::client::{Client, DeviceHandle, ExecutionConfig, ExecutionProfile, ProgramHandle};
use crate::graph::{describe_node, NodeKind, ProgramGraph, ENTRY_BLOCK};
use crate::shape::Shape;
use crate::tensor::TensorValue;
use crate::trace;

const DEFAULT_INFEED_CAPACITY: usize = 16;

/// Bound on how long one infeed pop may wait. A program starved of
/// infeed data fails the run instead of hanging the batch forever.
const INFEED_WAIT: Duration = Duration::from_secs(30);

pub struct HostClient {
    programs: Mutex<HashMap<u64, ProgramGraph>>,
    buffers: Mutex<HashMap<u64, TensorValue>>,
    next_id: AtomicU64,
    infeed_tx: Mutex<SyncSender<TensorValue>>,
    infeed_rx: Mutex<Receiver<TensorValue>>,
}

impl HostClient {
    pub fn new() -> Self {
        Self::with_infeed_capacity(DEFAULT_INFEED_CAPACITY)
    }

    /// Capacity bounds how many pushed infeed values may sit unconsumed;
    /// a full channel blocks the pusher.
    pub fn with_infeed_capacity(capacity: usize) -> Self {
        let (tx, rx) = sync_channel(capacity);
        Self {
            programs: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            infeed_tx: Mutex::new(tx),
            infeed_rx: Mutex::new(rx),
        }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn interpret(
        &self,
        program: &ProgramHandle,
        args: &[DeviceHandle],
        config: &ExecutionConfig,
    ) -> Result<(TensorValue, ExecutionProfile)> {
        let graph = {
            let programs = self.programs.lock().expect("program table mutex poisoned");
            programs
                .get(&program.id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown program handle {}", program.id))?
        };

        if args.len() != graph.params.len() {
            return Err(anyhow!(
                "program {} expects {} arguments, got {}",
                graph.name,
                graph.params.len(),
                args.len()
            ));
        }

        let mut env: HashMap<String, TensorValue> = HashMap::new();
        {
            let buffers = self.buffers.lock().expect("buffer table mutex poisoned");
            for (param, handle) in graph.params.iter().zip(args.iter()) {
                let value = buffers
                    .get(&handle.id)
                    .cloned()
                    .ok_or_else(|| anyhow!("stale device handle {}", handle.id))?;
                let got = Shape::new(value.dtype(), value.shape().to_vec());
                if got != param.shape {
                    return Err(anyhow!(
                        "argument {} shape mismatch: got {}, declared {}",
                        param.name,
                        got,
                        param.shape
                    ));
                }
                env.insert(param.name.clone(), value);
            }
        }

        let start = Instant::now();
        let mut result = None;
        let block = graph.block(ENTRY_BLOCK)?;
        for node in &block.nodes {
            let node_start = config.detailed_profile.then(Instant::now);
            match &node.kind {
                NodeKind::Fill { output, shape, value } => {
                    let tensor = TensorValue::filled(shape.dtype, &shape.dims, *value)?;
                    env.insert(output.clone(), tensor);
                }
                NodeKind::Infeed { output, shape } => {
                    let value = self.pop_infeed()?;
                    let got = Shape::new(value.dtype(), value.shape().to_vec());
                    if got != *shape {
                        return Err(anyhow!(
                            "infeed value shape mismatch: got {}, declared {}",
                            got,
                            shape
                        ));
                    }
                    env.insert(output.clone(), value);
                }
                NodeKind::Op { op, inputs, output } => {
                    let mut operands = Vec::with_capacity(inputs.len());
                    for input in inputs {
                        let value = env
                            .get(input)
                            .cloned()
                            .ok_or_else(|| anyhow!("unknown value: {}", input))?;
                        operands.push(value);
                    }
                    env.insert(output.clone(), exec_op(*op, &operands)?);
                }
                NodeKind::Return { input } => {
                    result = Some(
                        env.get(input)
                            .cloned()
                            .ok_or_else(|| anyhow!("unknown value: {}", input))?,
                    );
                    if let Some(node_start) = node_start {
                        log_node(node, node_start.elapsed());
                    }
                    break;
                }
            }
            if let Some(node_start) = node_start {
                log_node(node, node_start.elapsed());
            }
        }

        let profile = ExecutionProfile {
            compute_time: start.elapsed(),
        };
        let result = result.ok_or_else(|| anyhow!("program {} produced no result", graph.name))?;
        Ok((result, profile))
    }

    fn pop_infeed(&self) -> Result<TensorValue> {
        let rx = self.infeed_rx.lock().expect("infeed receiver mutex poisoned");
        rx.recv_timeout(INFEED_WAIT)
            .map_err(|_| anyhow!("infeed channel yielded no value within {:?}", INFEED_WAIT))
    }
}

impl Default for HostClient {
    fn default() -> Self {
        Self::new()
    }
}

fn log_node(node: &crate::graph::Node, elapsed: Duration) {
    trace!(
        "node {} {} -- {} -- ({}us)",
        node.index,
        node.uuid,
        describe_node(&node.kind),
        elapsed.as_micros()
    );
}

impl Client for HostClient {
    fn load_program(&self, program: &ProgramGraph) -> Result<ProgramHandle> {
        program.validate()?;
        let id = self.alloc_id();
        self.programs
            .lock()
            .expect("program table mutex poisoned")
            .insert(id, program.clone());
        Ok(ProgramHandle { id })
    }

    fn transfer_to_device(&self, value: &TensorValue) -> Result<DeviceHandle> {
        let id = self.alloc_id();
        let shape = Shape::new(value.dtype(), value.shape().to_vec());
        self.buffers
            .lock()
            .expect("buffer table mutex poisoned")
            .insert(id, value.clone());
        Ok(DeviceHandle::new(id, shape))
    }

    fn transfer_to_infeed(&self, value: &TensorValue) -> Result<()> {
        let tx = self.infeed_tx.lock().expect("infeed sender mutex poisoned");
        tx.send(value.clone())
            .map_err(|_| anyhow!("infeed channel is closed"))
    }

    fn execute(
        &self,
        program: &ProgramHandle,
        args: &[DeviceHandle],
        config: &ExecutionConfig,
    ) -> Result<ExecutionProfile> {
        let (_, profile) = self.interpret(program, args, config)?;
        Ok(profile)
    }

    fn execute_and_fetch(
        &self,
        program: &ProgramHandle,
        args: &[DeviceHandle],
        config: &ExecutionConfig,
    ) -> Result<(TensorValue, ExecutionProfile)> {
        self.interpret(program, args, config)
    }
}
