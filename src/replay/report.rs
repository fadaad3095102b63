//! Result report rendering.

use crate::formatting::render_value;
use crate::shape::Shape;
use crate::tensor::TensorValue;

/// Render the per-file report: the computed result's shape and literal,
/// plus a `was` line when the snapshot recorded an expected result. No
/// equality check happens here; comparison is left to whoever reads the
/// report.
pub fn render_report(
    path: &str,
    program_name: &str,
    result: &TensorValue,
    expected: Option<&TensorValue>,
) -> String {
    let shape = Shape::new(result.dtype(), result.shape().to_vec());
    let mut out = format!(
        "{}: {} :: {}:{}",
        path,
        program_name,
        shape,
        render_value(result)
    );
    if let Some(expected) = expected {
        let expected_shape = Shape::new(expected.dtype(), expected.shape().to_vec());
        out.push('\n');
        out.push_str(&format!(
            "was {}:{}",
            expected_shape,
            render_value(expected)
        ));
    }
    out
}
