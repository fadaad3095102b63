use std::sync::Arc;

use anyhow::Result;
use snapreplay::{render_report, DType, ReplayOptions, Shape, Snapshot, TensorValue};

use crate::common;

#[test]
fn report_without_expected_result_is_one_line() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::fill_program(&shape, 1.5)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let result = common::replay_with(&client, &snapshot, &ReplayOptions::default())
        .expect("replay succeeds")
        .expect("result requested");

    let report = render_report("case.snap", &snapshot.program.name, &result, None);
    assert_eq!(report.lines().count(), 1);
    assert_eq!(report, "case.snap: fill :: f32[2]:{1.50, 1.50}");
    assert!(!report.contains("was "));
    Ok(())
}

#[test]
fn report_with_expected_result_adds_the_was_line() -> Result<()> {
    let shape = Shape::new(DType::F32, vec![2]);
    let graph = common::identity_program(&shape)?;
    let arg = TensorValue::from(vec![4.0f32, 5.0]);
    let expected = TensorValue::from(vec![4.0f32, 5.0]);
    let (_dir, path) = common::write_snapshot(&graph, &[arg], Some(&expected))?;

    let snapshot = Snapshot::read(&path)?;
    let client = Arc::new(common::CountingClient::new());
    let result = common::replay_with(&client, &snapshot, &ReplayOptions::default())
        .expect("replay succeeds")
        .expect("result requested");

    let recorded = snapshot
        .result
        .as_ref()
        .expect("expected result recorded")
        .decode()?;
    let report = render_report("case.snap", &snapshot.program.name, &result, Some(&recorded));
    let lines = report.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("case.snap: identity :: "));
    assert!(lines[1].starts_with("was "));

    // Both rendered shapes parse back.
    for line in &lines {
        let shape_text = line
            .rsplit(":: ")
            .next()
            .unwrap()
            .trim_start_matches("was ")
            .split(':')
            .next()
            .unwrap();
        Shape::parse(shape_text)?;
    }
    Ok(())
}

#[test]
fn long_literals_are_truncated() {
    let value = TensorValue::from((0..100).map(|v| v as f32).collect::<Vec<_>>());
    let report = render_report("x", "p", &value, None);
    assert!(report.contains("{0.00, 1.00 ... 98.00, 99.00}"));
}

#[test]
fn identical_replays_render_identical_reports() -> Result<()> {
    let shape = Shape::new(DType::F64, vec![6]);
    let graph = common::identity_program(&shape)?;
    let (_dir, path) = common::write_snapshot(&graph, &[], None)?;

    let opts = ReplayOptions {
        use_fake_data: true,
        fake_seed: 11,
        ..ReplayOptions::default()
    };
    let mut reports = Vec::new();
    for _ in 0..2 {
        let snapshot = Snapshot::read(&path)?;
        let client = Arc::new(common::CountingClient::new());
        let result = common::replay_with(&client, &snapshot, &opts)
            .expect("replay succeeds")
            .expect("result requested");
        reports.push(render_report(
            "case.snap",
            &snapshot.program.name,
            &result,
            None,
        ));
    }
    assert_eq!(reports[0], reports[1]);
    Ok(())
}
