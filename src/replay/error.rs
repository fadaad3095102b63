use thiserror::Error;

/// Everything that can end one snapshot's replay. Every variant is
/// recoverable at the batch boundary: one file failing never stops the
/// files after it.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("snapshot unreadable: {cause:#}")]
    SnapshotRead { cause: anyhow::Error },

    #[error("backend rejected program: {cause:#}")]
    ProgramLoad { cause: anyhow::Error },

    #[error("invalid replay options: {reason}")]
    Options { reason: String },

    #[error("program declares {expected} parameters, snapshot records {recorded} arguments")]
    ArgumentCount { expected: usize, recorded: usize },

    #[error("recorded argument {index} is malformed: {cause:#}")]
    MalformedArgument { index: usize, cause: anyhow::Error },

    #[error("transfer of argument {index} failed: {cause:#}")]
    ArgumentTransfer { index: usize, cause: anyhow::Error },

    #[error("cannot infer infeed shape: program declares {count} infeed ops, expected at most one")]
    AmbiguousInfeed { count: usize },

    #[error("infeed worker failed after {pushed} pushes: {cause:#}")]
    FeedWorker { pushed: usize, cause: anyhow::Error },

    #[error("execution failed on run {run}: {cause:#}")]
    Execution { run: usize, cause: anyhow::Error },
}
