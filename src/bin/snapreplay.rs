//! Batch replay driver.
//!
//! Usage: snapreplay [FLAGS] <SNAPSHOT>...
//!
//! Replays each snapshot file in order against one shared backend
//! client and prints the result of the final run per file. Files that
//! are not readable snapshots are skipped; files whose replay fails
//! make the whole invocation exit non-zero, after all files ran.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use snapreplay::{
    render_report, replay_snapshot, Client, HostClient, InfeedMode, ReplayError, ReplayOptions,
    Shape, Snapshot,
};

/// Replay captured computation snapshots and print their results.
#[derive(Debug, Parser)]
#[command(name = "snapreplay", version, about)]
struct Cli {
    /// Snapshot files to replay, in order.
    #[arg(required = true, value_name = "SNAPSHOT")]
    files: Vec<PathBuf>,

    /// Replay using synthetic data instead of recorded arguments.
    #[arg(long)]
    use_fake_data: bool,

    /// Fetch and print the result of the computation.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    print_result: bool,

    /// Number of times to run each computation.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    num_runs: u64,

    /// Number of values the feed worker pushes into the infeed channel.
    #[arg(long, default_value_t = 10)]
    num_infeeds: usize,

    /// Shape of synthetic data to stream into the infeed, e.g. f32[8].
    #[arg(long, value_name = "SHAPE")]
    fake_infeed_shape: Option<String>,

    /// Derive the infeed shape from the computation's infeed operation.
    #[arg(long)]
    generate_fake_infeed: bool,

    /// Enable detailed profiling on the last run.
    #[arg(long)]
    profile_last_run: bool,

    /// Seed for the synthetic data generator.
    #[arg(long, default_value_t = 0)]
    fake_seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // An explicit shape wins over inference; both may be given.
    let infeed = match &cli.fake_infeed_shape {
        Some(text) => match Shape::parse(text) {
            Ok(shape) => InfeedMode::Explicit(shape),
            Err(err) => {
                eprintln!("invalid --fake-infeed-shape: {:#}", err);
                return ExitCode::FAILURE;
            }
        },
        None if cli.generate_fake_infeed => InfeedMode::Infer,
        None => InfeedMode::None,
    };
    let opts = ReplayOptions {
        use_fake_data: cli.use_fake_data,
        print_result: cli.print_result,
        num_runs: cli.num_runs as usize,
        num_infeeds: cli.num_infeeds,
        infeed,
        profile_last_run: cli.profile_last_run,
        fake_seed: cli.fake_seed,
    };

    // One client for the whole batch; dropped on every exit path.
    let client: Arc<dyn Client> = Arc::new(HostClient::new());

    let mut failed = false;
    for file in &cli.files {
        let display = file.display().to_string();
        let snapshot =
            match Snapshot::read(file).map_err(|cause| ReplayError::SnapshotRead { cause }) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    // Not a snapshot: skip the file, keep the batch alive.
                    eprintln!("{}: {}", display, err);
                    continue;
                }
            };

        match replay_snapshot(&client, &snapshot, &opts) {
            Ok(Some(result)) => {
                let expected = match &snapshot.result {
                    Some(record) => match record.decode() {
                        Ok(value) => Some(value),
                        Err(err) => {
                            eprintln!(
                                "{}: error: recorded expected result is malformed: {:#}",
                                display, err
                            );
                            failed = true;
                            continue;
                        }
                    },
                    None => None,
                };
                println!(
                    "{}",
                    render_report(&display, &snapshot.program.name, &result, expected.as_ref())
                );
            }
            Ok(None) => {}
            Err(err) => {
                eprintln!("{}: error: {}", display, err);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
