mod client;
mod fake;
mod formatting;
mod graph;
pub mod logging;
mod replay;
mod shape;
mod snapshot;
mod tensor;

pub use client::{
    Client, DeviceHandle, ExecutionConfig, ExecutionProfile, HostClient, ProgramHandle,
};
pub use fake::{fake_value, fake_value_with_rng, FakeValue};
pub use formatting::{format_truncated, render_value, FormatValue};
pub use graph::{
    describe_node, op_def, Block, Node, NodeKind, OpDef, OpKind, ParamDecl, ProgramGraph,
    ENTRY_BLOCK, OPS,
};
pub use replay::{
    provision_arguments, render_report, replay_snapshot, resolve_infeed_shape, run_repeated,
    FeedReport, FeedWorker, InfeedMode, ReplayError, ReplayOptions,
};
pub use shape::Shape;
pub use snapshot::{MappedSlice, RecordedValue, Snapshot};
pub use tensor::{numel, DType, Tensor, TensorValue};
