// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{normalize_axis, OpKind, TensorType};
use crate::OpError;
use tensor_core::Shape;

/// Axis along which `Gather` / `GatherElements` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatherParams {
    pub axis: i64,
}

fn check_indices(op: OpKind, indices: &TensorType) -> Result<(), OpError> {
    if !indices.dtype.is_index() {
        return Err(OpError::dtype(
            op,
            format!("indices must be i32 or i64, got {}", indices.dtype),
        ));
    }
    Ok(())
}

/// `data[:axis] + indices.shape + data[axis+1:]`.
pub(super) fn infer_gather(p: &GatherParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Gather;
    let (data, indices) = (&inputs[0], &inputs[1]);
    if data.rank() == 0 {
        return Err(OpError::rank(op, "data must have rank >= 1"));
    }
    check_indices(op, indices)?;
    let axis = normalize_axis(op, p.axis, data.rank())?;
    let dd = data.dims();
    let mut dims = dd[..axis].to_vec();
    dims.extend_from_slice(indices.dims());
    dims.extend_from_slice(&dd[axis + 1..]);
    Ok(TensorType::new(data.dtype, Shape::new(dims)))
}

/// Output takes the indices' shape; both operands share a rank.
pub(super) fn infer_gather_elements(
    p: &GatherParams,
    inputs: &[TensorType],
) -> Result<TensorType, OpError> {
    let op = OpKind::GatherElements;
    let (data, indices) = (&inputs[0], &inputs[1]);
    if data.rank() == 0 {
        return Err(OpError::rank(op, "data must have rank >= 1"));
    }
    if indices.rank() != data.rank() {
        return Err(OpError::rank(
            op,
            format!("indices {} and data {} differ in rank", indices.shape, data.shape),
        ));
    }
    check_indices(op, indices)?;
    normalize_axis(op, p.axis, data.rank())?;
    Ok(TensorType::new(data.dtype, indices.shape.clone()))
}
