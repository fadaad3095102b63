use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::shape::Shape;
use crate::tensor::{DType, Tensor, TensorValue};

/// Scalar types the synthetic generator can sample.
pub trait FakeValue: Sized + Copy {
    fn sample(rng: &mut StdRng) -> Self;
}

impl FakeValue for f32 {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0..=1.0)
    }
}

impl FakeValue for f64 {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0..=1.0)
    }
}

macro_rules! impl_fake_int {
    ($($ty:ty),+ $(,)?) => {
        $(impl FakeValue for $ty {
            fn sample(rng: &mut StdRng) -> Self {
                rng.gen_range(0..=100)
            }
        })+
    };
}

impl_fake_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FakeValue for bool {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(0..=1) == 1
    }
}

fn sample_tensor<T: FakeValue>(rng: &mut StdRng, shape: &Shape) -> Result<Tensor<T>> {
    let len = shape.numel();
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        data.push(T::sample(rng));
    }
    Tensor::with_shape(data, shape.dims.clone())
}

/// Generate one synthetic value for a declared shape. Deterministic per
/// seed: the same seed and shape always produce the same value.
pub fn fake_value(shape: &Shape, seed: u64) -> Result<TensorValue> {
    let mut rng = StdRng::seed_from_u64(seed);
    fake_value_with_rng(&mut rng, shape)
}

/// Generate one synthetic value drawing from a caller-owned generator.
/// Used when several values must differ while staying seed-reproducible.
pub fn fake_value_with_rng(rng: &mut StdRng, shape: &Shape) -> Result<TensorValue> {
    Ok(match shape.dtype {
        DType::I8 => TensorValue::I8(sample_tensor(rng, shape)?),
        DType::I16 => TensorValue::I16(sample_tensor(rng, shape)?),
        DType::I32 => TensorValue::I32(sample_tensor(rng, shape)?),
        DType::I64 => TensorValue::I64(sample_tensor(rng, shape)?),
        DType::U8 => TensorValue::U8(sample_tensor(rng, shape)?),
        DType::U16 => TensorValue::U16(sample_tensor(rng, shape)?),
        DType::U32 => TensorValue::U32(sample_tensor(rng, shape)?),
        DType::U64 => TensorValue::U64(sample_tensor(rng, shape)?),
        DType::F32 => TensorValue::F32(sample_tensor(rng, shape)?),
        DType::F64 => TensorValue::F64(sample_tensor(rng, shape)?),
        DType::Bool => TensorValue::Bool(sample_tensor(rng, shape)?),
    })
}
