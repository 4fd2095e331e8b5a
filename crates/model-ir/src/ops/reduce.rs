// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{normalize_axes, OpKind, TensorType};
use crate::OpError;
use tensor_core::Shape;

/// Reduction flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Mean,
    Max,
    Min,
    Sum,
}

impl ReduceOp {
    pub fn kind(self) -> OpKind {
        match self {
            Self::Mean => OpKind::ReduceMean,
            Self::Max => OpKind::ReduceMax,
            Self::Min => OpKind::ReduceMin,
            Self::Sum => OpKind::ReduceSum,
        }
    }

    pub fn from_kind(kind: OpKind) -> Option<Self> {
        match kind {
            OpKind::ReduceMean => Some(Self::Mean),
            OpKind::ReduceMax => Some(Self::Max),
            OpKind::ReduceMin => Some(Self::Min),
            OpKind::ReduceSum => Some(Self::Sum),
            _ => None,
        }
    }
}

/// Reduction parameters. Empty `axes` reduces every axis unless
/// `noop_with_empty_axes` is set, in which case the input passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceParams {
    pub op: ReduceOp,
    pub axes: Vec<i64>,
    pub keepdims: bool,
    pub noop_with_empty_axes: bool,
}

impl ReduceParams {
    pub fn new(op: ReduceOp) -> Self {
        Self {
            op,
            axes: Vec::new(),
            keepdims: true,
            noop_with_empty_axes: false,
        }
    }
}

pub(super) fn infer(p: &ReduceParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = p.op.kind();
    let x = &inputs[0];
    if p.axes.is_empty() && p.noop_with_empty_axes {
        return Ok(x.clone());
    }
    let axes = if p.axes.is_empty() {
        (0..x.rank()).collect()
    } else {
        normalize_axes(op, &p.axes, x.rank())?
    };
    let dims = x
        .dims()
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| match (axes.contains(&i), p.keepdims) {
            (false, _) => Some(d),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect();
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}

#[cfg(test)]
mod tests {
    use super::super::Operator;
    use super::*;
    use crate::ErrorKind;
    use tensor_core::DType;

    fn reduce(p: ReduceParams, dims: &[usize]) -> Result<Shape, OpError> {
        Operator::Reduce(p)
            .infer(&[TensorType::new(DType::F32, dims)])
            .map(|mut v| v.remove(0).shape)
    }

    #[test]
    fn test_reduce_mean_all_keepdims() {
        let out = reduce(ReduceParams::new(ReduceOp::Mean), &[2, 3, 3, 4]).unwrap();
        assert_eq!(out, Shape::from([1, 1, 1, 1]));
    }

    #[test]
    fn test_reduce_all_without_keepdims_is_scalar() {
        let p = ReduceParams {
            keepdims: false,
            ..ReduceParams::new(ReduceOp::Sum)
        };
        assert_eq!(reduce(p, &[2, 3]).unwrap(), Shape::scalar());
    }

    #[test]
    fn test_reduce_selected_axes() {
        let p = ReduceParams {
            axes: vec![1, -1],
            keepdims: false,
            ..ReduceParams::new(ReduceOp::Max)
        };
        assert_eq!(reduce(p, &[2, 3, 4, 5]).unwrap(), Shape::from([2, 4]));
    }

    #[test]
    fn test_reduce_noop_with_empty_axes() {
        let p = ReduceParams {
            noop_with_empty_axes: true,
            ..ReduceParams::new(ReduceOp::Min)
        };
        assert_eq!(reduce(p, &[2, 3]).unwrap(), Shape::from([2, 3]));
    }

    #[test]
    fn test_reduce_axis_out_of_range() {
        let p = ReduceParams {
            axes: vec![4],
            ..ReduceParams::new(ReduceOp::Mean)
        };
        let err = reduce(p, &[2, 3, 4, 5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
        assert_eq!(err.op(), OpKind::ReduceMean);
    }
}
