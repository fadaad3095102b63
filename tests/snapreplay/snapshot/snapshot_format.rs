use std::fs;

use anyhow::Result;
use snapreplay::{DType, Shape, Snapshot, TensorValue};

use crate::common;

#[test]
fn snapshot_round_trips() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::sub_program(&shape)?;
    let args = vec![
        TensorValue::from(vec![5.0f32, 7.0]),
        TensorValue::from(vec![2.0f32, 3.0]),
    ];
    let expected = TensorValue::from(vec![3.0f32, 4.0]);
    let (_dir, path) = common::write_snapshot(&graph, &args, Some(&expected))?;

    let snapshot = Snapshot::read(&path)?;
    assert_eq!(snapshot.program.name, "sub");
    assert_eq!(snapshot.program.params.len(), 2);
    assert_eq!(snapshot.arguments.len(), 2);
    for (record, original) in snapshot.arguments.iter().zip(args.iter()) {
        assert_eq!(&record.decode()?, original);
    }
    let result = snapshot.result.as_ref().expect("result recorded");
    assert_eq!(result.decode()?, expected);
    Ok(())
}

#[test]
fn snapshot_without_result_reads_back_none() -> Result<()> {
    let shape = Shape::new(DType::I64, vec![3]);
    let graph = common::identity_program(&shape)?;
    let args = vec![TensorValue::from(vec![1i64, 2, 3])];
    let (_dir, path) = common::write_snapshot(&graph, &args, None)?;

    let snapshot = Snapshot::read(&path)?;
    assert!(snapshot.result.is_none());
    assert_eq!(snapshot.arguments.len(), 1);
    Ok(())
}

#[test]
fn bad_magic_is_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![1]);
    let graph = common::fill_program(&shape, 1.0)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let mut bytes = fs::read(&path)?;
    bytes[0] = b'X';
    fs::write(&path, bytes)?;
    assert!(Snapshot::read(&path).is_err());
    Ok(())
}

#[test]
fn truncated_file_is_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![1]);
    let graph = common::fill_program(&shape, 1.0)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let bytes = fs::read(&path)?;
    fs::write(&path, &bytes[..10])?;
    assert!(Snapshot::read(&path).is_err());
    Ok(())
}

#[test]
fn unsupported_version_is_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![1]);
    let graph = common::fill_program(&shape, 1.0)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    // Version field follows the 5-byte magic.
    let mut bytes = fs::read(&path)?;
    bytes[5..9].copy_from_slice(&99u32.to_le_bytes());
    fs::write(&path, bytes)?;
    assert!(Snapshot::read(&path).is_err());
    Ok(())
}

#[test]
fn non_ascending_section_offsets_are_rejected() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![1]);
    let graph = common::fill_program(&shape, 1.0)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    // Push the program offset past the argument section offset.
    let mut bytes = fs::read(&path)?;
    let args_offset = u64::from_le_bytes(bytes[33..41].try_into().expect("8 bytes"));
    bytes[17..25].copy_from_slice(&(args_offset + 8).to_le_bytes());
    fs::write(&path, bytes)?;
    assert!(Snapshot::read(&path).is_err());
    Ok(())
}

#[test]
fn recorded_shapes_are_preserved() -> Result<()> {
    let shape = Shape::new(DType::U16, vec![2, 3]);
    let graph = common::identity_program(&shape)?;
    let arg = TensorValue::U16(snapreplay::Tensor::with_shape(
        vec![1u16, 2, 3, 4, 5, 6],
        vec![2, 3],
    )?);
    let (_dir, path) = common::write_snapshot(&graph, &[arg.clone()], None)?;

    let snapshot = Snapshot::read(&path)?;
    assert_eq!(snapshot.arguments[0].shape(), shape);
    assert_eq!(snapshot.arguments[0].decode()?, arg);
    Ok(())
}
