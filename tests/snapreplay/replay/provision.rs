use std::fs;
use std::sync::Arc;

use anyhow::Result;
use snapreplay::{
    fake_value, DType, ReplayError, ReplayOptions, Shape, Snapshot, Tensor, TensorValue,
};

use crate::common;

#[test]
fn recorded_arguments_keep_declared_order() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::sub_program(&shape)?;
    let first = TensorValue::from(vec![5.0f32, 7.0]);
    let second = TensorValue::from(vec![2.0f32, 3.0]);
    let (_dir, path) = common::write_snapshot(&graph, &[first, second], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let result = common::replay_with(&client, &snapshot, &ReplayOptions::default())
        .expect("replay succeeds")
        .expect("result requested");

    // sub(p0, p1): a swapped argument order would flip the sign.
    let expected = TensorValue::F32(Tensor::with_shape(vec![3.0, 4.0], vec![2])?);
    assert_eq!(result, expected);
    Ok(())
}

#[test]
fn recorded_argument_count_mismatch_is_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::identity_program(&shape)?;
    let extra = TensorValue::from(vec![1.0f32, 2.0]);
    let args = vec![extra.clone(), extra];
    let (_dir, path) = common::write_snapshot(&graph, &args, None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let err = common::replay_with(&client, &snapshot, &ReplayOptions::default())
        .expect_err("count mismatch must fail");
    assert!(matches!(
        err,
        ReplayError::ArgumentCount {
            expected: 1,
            recorded: 2
        }
    ));
    assert_eq!(client.executes(), 0);
    Ok(())
}

#[test]
fn fake_data_never_consults_recorded_arguments() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![3]);
    let graph = common::identity_program(&shape)?;
    // Recorded arguments deliberately absent; the fake path must not
    // notice.
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let opts = ReplayOptions {
        use_fake_data: true,
        ..ReplayOptions::default()
    };
    let result = common::replay_with(&client, &snapshot, &opts)
        .expect("fake replay succeeds")
        .expect("result requested");
    assert_eq!(result.dtype(), DType::F32);
    assert_eq!(result.shape(), &[3]);
    Ok(())
}

#[test]
fn fake_values_are_deterministic_per_seed() -> Result<()> {
    let shape = Shape::new(DType::F64, vec![8]);
    let a = fake_value(&shape, 7)?;
    let b = fake_value(&shape, 7)?;
    let c = fake_value(&shape, 8)?;
    assert_eq!(a, b);
    assert_ne!(a, c);
    Ok(())
}

#[test]
fn malformed_recorded_argument_fails_at_provisioning() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![4]);
    let graph = common::identity_program(&shape)?;
    let arg = TensorValue::from(vec![1.0f32, 2.0, 3.0, 4.0]);
    let (_dir, path) = common::write_snapshot(&graph, &[arg], None)?;

    // Corrupt the first record's leading dimension so its byte payload
    // no longer matches the declared shape. Header layout: the argument
    // section offset sits at byte 33; a record starts with dtype (u32)
    // and ndim (u32), so its first dim is 8 bytes in.
    let mut bytes = fs::read(&path)?;
    let args_offset =
        u64::from_le_bytes(bytes[33..41].try_into().expect("8 bytes")) as usize;
    let dim_offset = args_offset + 8;
    let dim = u64::from_le_bytes(bytes[dim_offset..dim_offset + 8].try_into().expect("8 bytes"));
    bytes[dim_offset..dim_offset + 8].copy_from_slice(&(dim + 1).to_le_bytes());
    fs::write(&path, bytes)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let err = common::replay_with(&client, &snapshot, &ReplayOptions::default())
        .expect_err("malformed record must fail");
    assert!(matches!(err, ReplayError::MalformedArgument { index: 0, .. }));
    assert_eq!(client.executes(), 0);
    Ok(())
}
