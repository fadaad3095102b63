use std::sync::Arc;

use anyhow::Result;
use snapreplay::{
    Client, DType, InfeedMode, ReplayError, ReplayOptions, Shape, Snapshot, TensorValue,
};

use crate::common;

#[test]
fn runs_exactly_n_times() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::identity_program(&shape)?;
    let arg = TensorValue::from(vec![1.0f32, 2.0]);
    let (_dir, path) = common::write_snapshot(&graph, &[arg], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        num_runs: 4,
        ..ReplayOptions::default()
    };
    common::replay_with(&client, &snapshot, &opts).expect("replay succeeds");
    assert_eq!(client.executes(), 4);
    assert_eq!(client.fetches(), 4);
    Ok(())
}

#[test]
fn only_the_last_run_result_is_returned() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![1]);
    let graph = common::infeed_program(&shape)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    // Hand-feed three distinct values; each run consumes one in order.
    for v in [1.0f32, 2.0, 3.0] {
        client.transfer_to_infeed(&TensorValue::from(vec![v]))?;
    }
    let opts = ReplayOptions {
        num_runs: 3,
        infeed: InfeedMode::None,
        ..ReplayOptions::default()
    };
    let result = common::replay_with(&client, &snapshot, &opts)
        .expect("replay succeeds")
        .expect("result requested");
    assert_eq!(result, TensorValue::from(vec![3.0f32]));
    Ok(())
}

#[test]
fn skipping_result_retrieval_returns_none() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::identity_program(&shape)?;
    let arg = TensorValue::from(vec![1.0f32, 2.0]);
    let (_dir, path) = common::write_snapshot(&graph, &[arg], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        print_result: false,
        num_runs: 3,
        ..ReplayOptions::default()
    };
    let result = common::replay_with(&client, &snapshot, &opts).expect("replay succeeds");
    assert!(result.is_none());
    assert_eq!(client.executes(), 3);
    assert_eq!(client.fetches(), 0);
    Ok(())
}

#[test]
fn detailed_profile_applies_to_the_final_run_only() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::fill_program(&shape, 0.5)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        num_runs: 3,
        profile_last_run: true,
        ..ReplayOptions::default()
    };
    common::replay_with(&client, &snapshot, &opts).expect("replay succeeds");
    assert_eq!(client.profile_flags(), vec![false, false, true]);
    Ok(())
}

#[test]
fn zero_runs_are_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::fill_program(&shape, 0.5)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        num_runs: 0,
        ..ReplayOptions::default()
    };
    let err = common::replay_with(&client, &snapshot, &opts).expect_err("zero runs invalid");
    assert!(matches!(err, ReplayError::Options { .. }));
    Ok(())
}

#[test]
fn first_execution_failure_aborts_remaining_runs() -> Result<()> {
    // sub over mismatched dtypes fails inside the backend at run time.
    let mut graph = common::sub_program(&Shape::new(DType::F32, vec![2]))?;
    graph.params[1].shape = Shape::new(DType::F64, vec![2]);
    let args = vec![
        TensorValue::from(vec![1.0f32, 2.0]),
        TensorValue::from(vec![1.0f64, 2.0]),
    ];
    let (_dir, path) = common::write_snapshot(&graph, &args, None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        num_runs: 5,
        ..ReplayOptions::default()
    };
    let err = common::replay_with(&client, &snapshot, &opts).expect_err("execution fails");
    assert!(matches!(err, ReplayError::Execution { run: 0, .. }));
    assert_eq!(client.executes(), 1);
    Ok(())
}
