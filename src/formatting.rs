use crate::tensor::TensorValue;

/// Format a value for compact human-readable output.
pub trait FormatValue {
    fn format_value(&self) -> String;
}

impl FormatValue for f32 {
    fn format_value(&self) -> String {
        format!("{:.2}", self)
    }
}

impl FormatValue for f64 {
    fn format_value(&self) -> String {
        format!("{:.2}", self)
    }
}

macro_rules! impl_format_display {
    ($($ty:ty),+ $(,)?) => {
        $(impl FormatValue for $ty {
            fn format_value(&self) -> String {
                self.to_string()
            }
        })+
    };
}

impl_format_display!(i8, i16, i32, i64, u8, u16, u32, u64, bool);

/// Format a slice with head/tail truncation.
pub fn format_truncated<T: FormatValue>(data: &[T]) -> String {
    let len = data.len();
    if len == 0 {
        return "{}".to_string();
    }
    if len <= 4 {
        let joined = data
            .iter()
            .map(FormatValue::format_value)
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{{{}}}", joined);
    }
    let head = &data[..2];
    let tail = &data[len - 2..];
    format!(
        "{{{}, {} ... {}, {}}}",
        head[0].format_value(),
        head[1].format_value(),
        tail[0].format_value(),
        tail[1].format_value()
    )
}

/// Render a tensor's elements as a truncated literal string.
pub fn render_value(value: &TensorValue) -> String {
    match value {
        TensorValue::I8(t) => format_truncated(t.data()),
        TensorValue::I16(t) => format_truncated(t.data()),
        TensorValue::I32(t) => format_truncated(t.data()),
        TensorValue::I64(t) => format_truncated(t.data()),
        TensorValue::U8(t) => format_truncated(t.data()),
        TensorValue::U16(t) => format_truncated(t.data()),
        TensorValue::U32(t) => format_truncated(t.data()),
        TensorValue::U64(t) => format_truncated(t.data()),
        TensorValue::F32(t) => format_truncated(t.data()),
        TensorValue::F64(t) => format_truncated(t.data()),
        TensorValue::Bool(t) => format_truncated(t.data()),
    }
}
