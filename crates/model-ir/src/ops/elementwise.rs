// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise operators: broadcasting binaries, unaries, `Where`, `Clip`.

use super::{OpKind, TensorType};
use crate::OpError;
use tensor_core::{DType, Shape, Tensor};

/// Broadcasting binary arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn kind(self) -> OpKind {
        match self {
            Self::Add => OpKind::Add,
            Self::Sub => OpKind::Sub,
            Self::Mul => OpKind::Mul,
            Self::Div => OpKind::Div,
            Self::Pow => OpKind::Pow,
        }
    }

    pub fn from_kind(kind: OpKind) -> Option<Self> {
        match kind {
            OpKind::Add => Some(Self::Add),
            OpKind::Sub => Some(Self::Sub),
            OpKind::Mul => Some(Self::Mul),
            OpKind::Div => Some(Self::Div),
            OpKind::Pow => Some(Self::Pow),
            _ => None,
        }
    }
}

/// Shape-preserving single-input operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Relu,
    Sigmoid,
    Tanh,
    Abs,
    Identity,
}

impl UnaryOp {
    pub fn kind(self) -> OpKind {
        match self {
            Self::Relu => OpKind::Relu,
            Self::Sigmoid => OpKind::Sigmoid,
            Self::Tanh => OpKind::Tanh,
            Self::Abs => OpKind::Abs,
            Self::Identity => OpKind::Identity,
        }
    }

    pub fn from_kind(kind: OpKind) -> Option<Self> {
        match kind {
            OpKind::Relu => Some(Self::Relu),
            OpKind::Sigmoid => Some(Self::Sigmoid),
            OpKind::Tanh => Some(Self::Tanh),
            OpKind::Abs => Some(Self::Abs),
            OpKind::Identity => Some(Self::Identity),
            _ => None,
        }
    }
}

/// Optional scalar bounds, stored with the input's element type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipParams {
    pub min: Option<Tensor>,
    pub max: Option<Tensor>,
}

fn broadcast(op: OpKind, a: &Shape, b: &Shape) -> Result<Shape, OpError> {
    a.broadcast(b).map_err(|e| OpError::broadcast(op, e))
}

pub(super) fn infer_binary(bin: BinaryOp, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = bin.kind();
    let (a, b) = (&inputs[0], &inputs[1]);
    // Pow allows a differently typed exponent.
    if bin != BinaryOp::Pow {
        super::same_dtype(op, &[a, b])?;
    }
    Ok(TensorType::new(a.dtype, broadcast(op, &a.shape, &b.shape)?))
}

pub(super) fn infer_where(inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Where;
    let (cond, x, y) = (&inputs[0], &inputs[1], &inputs[2]);
    if cond.dtype != DType::Bool {
        return Err(OpError::dtype(op, format!("condition has dtype {}", cond.dtype)));
    }
    super::same_dtype(op, &[x, y])?;
    let shape = broadcast(op, &cond.shape, &x.shape)?;
    let shape = broadcast(op, &shape, &y.shape)?;
    Ok(TensorType::new(x.dtype, shape))
}

pub(super) fn infer_clip(p: &ClipParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Clip;
    let x = &inputs[0];
    for (role, bound) in [("min", &p.min), ("max", &p.max)] {
        if let Some(t) = bound {
            if t.dtype() != x.dtype {
                return Err(OpError::dtype(
                    op,
                    format!("{role} is {} but input is {}", t.dtype(), x.dtype),
                ));
            }
            if !t.is_scalar_like() {
                return Err(OpError::shape(op, format!("{role} {} is not a scalar", t.shape())));
            }
        }
    }
    Ok(x.clone())
}

#[cfg(test)]
mod tests {
    use super::super::Operator;
    use super::*;
    use crate::ErrorKind;

    fn t(dims: &[usize]) -> TensorType {
        TensorType::new(DType::F32, dims)
    }

    #[test]
    fn test_binary_broadcast() {
        for bin in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let out = Operator::Binary(bin)
                .infer(&[t(&[1, 3, 1, 1]), t(&[1, 1, 5, 7])])
                .unwrap();
            assert_eq!(out[0].shape, Shape::from([1, 3, 5, 7]));
        }
    }

    #[test]
    fn test_binary_identical_shapes() {
        let out = Operator::Binary(BinaryOp::Add)
            .infer(&[t(&[1, 3, 5, 7]), t(&[1, 3, 5, 7])])
            .unwrap();
        assert_eq!(out[0].shape, Shape::from([1, 3, 5, 7]));
    }

    #[test]
    fn test_binary_incompatible() {
        let err = Operator::Binary(BinaryOp::Mul)
            .infer(&[t(&[2, 3]), t(&[3, 2])])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_pow_mixed_types() {
        let out = Operator::Binary(BinaryOp::Pow)
            .infer(&[t(&[4]), TensorType::new(DType::I64, Shape::scalar())])
            .unwrap();
        assert_eq!(out[0], t(&[4]));
        assert!(Operator::Binary(BinaryOp::Add)
            .infer(&[t(&[4]), TensorType::new(DType::I64, Shape::scalar())])
            .is_err());
    }

    #[test]
    fn test_where_three_way() {
        let out = Operator::Where
            .infer(&[
                TensorType::new(DType::Bool, [1, 4]),
                t(&[3, 1]),
                t(&[4]),
            ])
            .unwrap();
        assert_eq!(out[0].shape, Shape::from([3, 4]));
    }

    #[test]
    fn test_where_condition_type() {
        let err = Operator::Where.infer(&[t(&[2]), t(&[2]), t(&[2])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_clip_bounds() {
        let p = ClipParams {
            min: Some(Tensor::scalar_f32(0.0)),
            max: Some(Tensor::scalar_f32(6.0)),
        };
        let out = Operator::Clip(p).infer(&[t(&[2, 8])]).unwrap();
        assert_eq!(out[0], t(&[2, 8]));

        let p = ClipParams {
            min: Some(Tensor::vector_i64(&[0])),
            max: None,
        };
        let err = Operator::Clip(p).infer(&[t(&[2, 8])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_kind_mapping() {
        for bin in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div, BinaryOp::Pow] {
            assert_eq!(BinaryOp::from_kind(bin.kind()), Some(bin));
        }
        assert_eq!(UnaryOp::from_kind(OpKind::Tanh), Some(UnaryOp::Tanh));
        assert_eq!(UnaryOp::from_kind(OpKind::Softmax), None);
    }
}
