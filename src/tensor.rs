use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Element type of a tensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
}

impl DType {
    pub fn from_ident(ident: &str) -> Result<Self> {
        match ident {
            "i8" => Ok(DType::I8),
            "i16" => Ok(DType::I16),
            "i32" => Ok(DType::I32),
            "i64" => Ok(DType::I64),
            "u8" => Ok(DType::U8),
            "u16" => Ok(DType::U16),
            "u32" => Ok(DType::U32),
            "u64" => Ok(DType::U64),
            "f32" => Ok(DType::F32),
            "f64" => Ok(DType::F64),
            "bool" => Ok(DType::Bool),
            _ => Err(anyhow!("unsupported dtype: {}", ident)),
        }
    }

    pub fn ident(&self) -> &'static str {
        match self {
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Bool => "bool",
        }
    }

    /// Size of one element in the serialized little-endian form.
    pub fn byte_width(&self) -> usize {
        match self {
            DType::I8 | DType::U8 | DType::Bool => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }
}

pub fn numel(shape: &[usize]) -> usize {
    shape.iter().copied().product::<usize>()
}

/// Dense tensor owning its data. The shape's element count always equals
/// the data length.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T> Tensor<T> {
    /// Rank-1 tensor over the given values.
    pub fn new(data: Vec<T>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    pub fn with_shape(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let expected = numel(&shape);
        if expected != data.len() {
            return Err(anyhow!(
                "tensor shape {:?} expects {} values, got {}",
                shape,
                expected,
                data.len()
            ));
        }
        Ok(Self { data, shape })
    }

    pub fn from_scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

/// Dtype-tagged tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorValue {
    I8(Tensor<i8>),
    I16(Tensor<i16>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
    U8(Tensor<u8>),
    U16(Tensor<u16>),
    U32(Tensor<u32>),
    U64(Tensor<u64>),
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    Bool(Tensor<bool>),
}

macro_rules! dispatch_tensor_value {
    ($value:expr, $tensor:ident => $body:expr) => {
        match $value {
            TensorValue::I8($tensor) => $body,
            TensorValue::I16($tensor) => $body,
            TensorValue::I32($tensor) => $body,
            TensorValue::I64($tensor) => $body,
            TensorValue::U8($tensor) => $body,
            TensorValue::U16($tensor) => $body,
            TensorValue::U32($tensor) => $body,
            TensorValue::U64($tensor) => $body,
            TensorValue::F32($tensor) => $body,
            TensorValue::F64($tensor) => $body,
            TensorValue::Bool($tensor) => $body,
        }
    };
}

impl TensorValue {
    pub fn dtype(&self) -> DType {
        match self {
            TensorValue::I8(_) => DType::I8,
            TensorValue::I16(_) => DType::I16,
            TensorValue::I32(_) => DType::I32,
            TensorValue::I64(_) => DType::I64,
            TensorValue::U8(_) => DType::U8,
            TensorValue::U16(_) => DType::U16,
            TensorValue::U32(_) => DType::U32,
            TensorValue::U64(_) => DType::U64,
            TensorValue::F32(_) => DType::F32,
            TensorValue::F64(_) => DType::F64,
            TensorValue::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_tensor_value!(self, tensor => tensor.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &[usize] {
        dispatch_tensor_value!(self, tensor => tensor.shape())
    }

    /// Constant tensor filled with a scalar, cast to the requested dtype.
    pub fn filled(dtype: DType, shape: &[usize], value: f64) -> Result<Self> {
        let len = numel(shape);
        let shape = shape.to_vec();
        Ok(match dtype {
            DType::I8 => TensorValue::I8(Tensor::with_shape(vec![value as i8; len], shape)?),
            DType::I16 => TensorValue::I16(Tensor::with_shape(vec![value as i16; len], shape)?),
            DType::I32 => TensorValue::I32(Tensor::with_shape(vec![value as i32; len], shape)?),
            DType::I64 => TensorValue::I64(Tensor::with_shape(vec![value as i64; len], shape)?),
            DType::U8 => TensorValue::U8(Tensor::with_shape(vec![value as u8; len], shape)?),
            DType::U16 => TensorValue::U16(Tensor::with_shape(vec![value as u16; len], shape)?),
            DType::U32 => TensorValue::U32(Tensor::with_shape(vec![value as u32; len], shape)?),
            DType::U64 => TensorValue::U64(Tensor::with_shape(vec![value as u64; len], shape)?),
            DType::F32 => TensorValue::F32(Tensor::with_shape(vec![value as f32; len], shape)?),
            DType::F64 => TensorValue::F64(Tensor::with_shape(vec![value; len], shape)?),
            DType::Bool => {
                TensorValue::Bool(Tensor::with_shape(vec![value != 0.0; len], shape)?)
            }
        })
    }

    /// Serialize the element data as packed little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        fn pack<T: Copy>(data: &[T], width: usize, write: impl Fn(T, &mut Vec<u8>)) -> Vec<u8> {
            let mut out = Vec::with_capacity(data.len() * width);
            for value in data {
                write(*value, &mut out);
            }
            out
        }
        match self {
            TensorValue::I8(t) => pack(t.data(), 1, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::I16(t) => pack(t.data(), 2, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::I32(t) => pack(t.data(), 4, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::I64(t) => pack(t.data(), 8, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::U8(t) => pack(t.data(), 1, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::U16(t) => pack(t.data(), 2, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::U32(t) => pack(t.data(), 4, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::U64(t) => pack(t.data(), 8, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::F32(t) => pack(t.data(), 4, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::F64(t) => pack(t.data(), 8, |v, out| out.extend_from_slice(&v.to_le_bytes())),
            TensorValue::Bool(t) => pack(t.data(), 1, |v, out| out.push(v as u8)),
        }
    }

    /// Rebuild a tensor from packed little-endian bytes. The byte length
    /// must match the shape's element count exactly.
    pub fn from_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> Result<Self> {
        let len = numel(shape);
        let expected = len * dtype.byte_width();
        if bytes.len() != expected {
            return Err(anyhow!(
                "{} tensor with shape {:?} expects {} bytes, got {}",
                dtype.ident(),
                shape,
                expected,
                bytes.len()
            ));
        }
        fn unpack<T, const W: usize>(
            bytes: &[u8],
            shape: &[usize],
            read: impl Fn([u8; W]) -> T,
        ) -> Result<Tensor<T>> {
            let mut out = Vec::with_capacity(bytes.len() / W);
            for chunk in bytes.chunks_exact(W) {
                let mut raw = [0u8; W];
                raw.copy_from_slice(chunk);
                out.push(read(raw));
            }
            Tensor::with_shape(out, shape.to_vec())
        }
        Ok(match dtype {
            DType::I8 => TensorValue::I8(unpack(bytes, shape, i8::from_le_bytes)?),
            DType::I16 => TensorValue::I16(unpack(bytes, shape, i16::from_le_bytes)?),
            DType::I32 => TensorValue::I32(unpack(bytes, shape, i32::from_le_bytes)?),
            DType::I64 => TensorValue::I64(unpack(bytes, shape, i64::from_le_bytes)?),
            DType::U8 => TensorValue::U8(unpack(bytes, shape, u8::from_le_bytes)?),
            DType::U16 => TensorValue::U16(unpack(bytes, shape, u16::from_le_bytes)?),
            DType::U32 => TensorValue::U32(unpack(bytes, shape, u32::from_le_bytes)?),
            DType::U64 => TensorValue::U64(unpack(bytes, shape, u64::from_le_bytes)?),
            DType::F32 => TensorValue::F32(unpack(bytes, shape, f32::from_le_bytes)?),
            DType::F64 => TensorValue::F64(unpack(bytes, shape, f64::from_le_bytes)?),
            DType::Bool => TensorValue::Bool(unpack(bytes, shape, |raw: [u8; 1]| raw[0] != 0)?),
        })
    }

    pub fn as_i32(&self) -> Result<&Tensor<i32>> {
        match self {
            TensorValue::I32(tensor) => Ok(tensor),
            _ => Err(anyhow!("expected i32 tensor")),
        }
    }

    pub fn as_i64(&self) -> Result<&Tensor<i64>> {
        match self {
            TensorValue::I64(tensor) => Ok(tensor),
            _ => Err(anyhow!("expected i64 tensor")),
        }
    }

    pub fn as_f32(&self) -> Result<&Tensor<f32>> {
        match self {
            TensorValue::F32(tensor) => Ok(tensor),
            _ => Err(anyhow!("expected f32 tensor")),
        }
    }

    pub fn as_f64(&self) -> Result<&Tensor<f64>> {
        match self {
            TensorValue::F64(tensor) => Ok(tensor),
            _ => Err(anyhow!("expected f64 tensor")),
        }
    }

    pub fn as_bool(&self) -> Result<&Tensor<bool>> {
        match self {
            TensorValue::Bool(tensor) => Ok(tensor),
            _ => Err(anyhow!("expected bool tensor")),
        }
    }
}

macro_rules! impl_tensor_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl From<Tensor<$ty>> for TensorValue {
            fn from(value: Tensor<$ty>) -> Self {
                TensorValue::$variant(value)
            }
        }
        impl From<Vec<$ty>> for TensorValue {
            fn from(value: Vec<$ty>) -> Self {
                TensorValue::$variant(Tensor::new(value))
            }
        })+
    };
}

impl_tensor_from!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
);
