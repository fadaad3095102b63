#[path = "common/mod.rs"]
mod common;

#[path = "replay/provision.rs"]
mod provision;
#[path = "replay/infeed.rs"]
mod infeed;
#[path = "replay/executor.rs"]
mod executor;
#[path = "replay/report.rs"]
mod report;

#[path = "snapshot/snapshot_format.rs"]
mod snapshot_format;
