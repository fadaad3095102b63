//! Elementwise CPU kernels for the host backend.

use anyhow::{anyhow, Result};

use crate::graph::{op_def, OpKind};
use crate::tensor::{Tensor, TensorValue};

pub fn exec_op(op: OpKind, inputs: &[TensorValue]) -> Result<TensorValue> {
    let def = op_def(op);
    if inputs.len() != def.inputs {
        return Err(anyhow!(
            "op {} expects {} inputs, got {}",
            def.name,
            def.inputs,
            inputs.len()
        ));
    }
    match def.inputs {
        1 => exec_unary(op, &inputs[0]),
        2 => exec_binary(op, &inputs[0], &inputs[1]),
        n => Err(anyhow!("unsupported op arity {}", n)),
    }
}

fn exec_binary(op: OpKind, a: &TensorValue, b: &TensorValue) -> Result<TensorValue> {
    if a.dtype() != b.dtype() {
        return Err(anyhow!(
            "op {} dtype mismatch: {} vs {}",
            op_def(op).name,
            a.dtype().ident(),
            b.dtype().ident()
        ));
    }
    if a.shape() != b.shape() {
        return Err(anyhow!(
            "op {} shape mismatch: {:?} vs {:?}",
            op_def(op).name,
            a.shape(),
            b.shape()
        ));
    }
    match (a, b) {
        (TensorValue::F32(a), TensorValue::F32(b)) => {
            Ok(TensorValue::F32(binary_float(op, a, b)?))
        }
        (TensorValue::F64(a), TensorValue::F64(b)) => {
            Ok(TensorValue::F64(binary_float(op, a, b)?))
        }
        (TensorValue::I32(a), TensorValue::I32(b)) => Ok(TensorValue::I32(binary_int(op, a, b)?)),
        (TensorValue::I64(a), TensorValue::I64(b)) => Ok(TensorValue::I64(binary_int(op, a, b)?)),
        _ => Err(anyhow!(
            "op {} does not support dtype {}",
            op_def(op).name,
            a.dtype().ident()
        )),
    }
}

fn exec_unary(op: OpKind, input: &TensorValue) -> Result<TensorValue> {
    match input {
        TensorValue::F32(t) => Ok(TensorValue::F32(unary_float(op, t)?)),
        TensorValue::F64(t) => Ok(TensorValue::F64(unary_float(op, t)?)),
        TensorValue::I32(t) => Ok(TensorValue::I32(unary_int(op, t)?)),
        TensorValue::I64(t) => Ok(TensorValue::I64(unary_int(op, t)?)),
        _ => Err(anyhow!(
            "op {} does not support dtype {}",
            op_def(op).name,
            input.dtype().ident()
        )),
    }
}

macro_rules! zip_map {
    ($a:expr, $b:expr, $f:expr) => {{
        let data = $a
            .data()
            .iter()
            .zip($b.data().iter())
            .map(|(x, y)| $f(*x, *y))
            .collect::<Vec<_>>();
        Tensor::with_shape(data, $a.shape().to_vec())
    }};
}

macro_rules! map {
    ($t:expr, $f:expr) => {{
        let data = $t.data().iter().map(|x| $f(*x)).collect::<Vec<_>>();
        Tensor::with_shape(data, $t.shape().to_vec())
    }};
}

fn binary_float<T>(op: OpKind, a: &Tensor<T>, b: &Tensor<T>) -> Result<Tensor<T>>
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<Output = T> + PartialOrd,
{
    match op {
        OpKind::Add => zip_map!(a, b, |x: T, y: T| x + y),
        OpKind::Sub => zip_map!(a, b, |x: T, y: T| x - y),
        OpKind::Mul => zip_map!(a, b, |x: T, y: T| x * y),
        OpKind::Min => zip_map!(a, b, |x: T, y: T| if x < y { x } else { y }),
        OpKind::Max => zip_map!(a, b, |x: T, y: T| if x > y { x } else { y }),
        _ => Err(anyhow!("op {} is not binary", op_def(op).name)),
    }
}

fn binary_int<T>(op: OpKind, a: &Tensor<T>, b: &Tensor<T>) -> Result<Tensor<T>>
where
    T: Copy
        + Ord
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>,
{
    match op {
        OpKind::Add => zip_map!(a, b, |x: T, y: T| x + y),
        OpKind::Sub => zip_map!(a, b, |x: T, y: T| x - y),
        OpKind::Mul => zip_map!(a, b, |x: T, y: T| x * y),
        OpKind::Min => zip_map!(a, b, |x: T, y: T| x.min(y)),
        OpKind::Max => zip_map!(a, b, |x: T, y: T| x.max(y)),
        _ => Err(anyhow!("op {} is not binary", op_def(op).name)),
    }
}

fn unary_float<T>(op: OpKind, t: &Tensor<T>) -> Result<Tensor<T>>
where
    T: Copy + Default + std::ops::Neg<Output = T> + PartialOrd,
{
    let zero = T::default();
    match op {
        OpKind::Abs => map!(t, |x: T| if x < zero { -x } else { x }),
        OpKind::Neg => map!(t, |x: T| -x),
        OpKind::Relu => map!(t, |x: T| if x < zero { zero } else { x }),
        _ => Err(anyhow!("op {} is not unary", op_def(op).name)),
    }
}

fn unary_int<T>(op: OpKind, t: &Tensor<T>) -> Result<Tensor<T>>
where
    T: Copy + Default + Ord + std::ops::Neg<Output = T>,
{
    let zero = T::default();
    match op {
        OpKind::Abs => map!(t, |x: T| if x < zero { -x } else { x }),
        OpKind::Neg => map!(t, |x: T| -x),
        OpKind::Relu => map!(t, |x: T| x.max(zero)),
        _ => Err(anyhow!("op {} is not unary", op_def(op).name)),
    }
}
