// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::conv::Window;
use super::{AutoPad, OpKind, TensorType};
use crate::OpError;
use tensor_core::Shape;

/// Windowed pooling parameters (max and average).
///
/// `kernel_shape` is required; the other vectors follow [`super::ConvParams`]
/// conventions. `count_include_pad` only affects average pooling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoolParams {
    pub kernel_shape: Vec<usize>,
    pub pads: Vec<usize>,
    pub strides: Vec<usize>,
    pub dilations: Vec<usize>,
    pub auto_pad: AutoPad,
    pub ceil_mode: bool,
    pub count_include_pad: bool,
}

pub(super) fn infer(op: OpKind, p: &PoolParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let x = &inputs[0];
    if x.rank() < 3 {
        return Err(OpError::rank(op, format!("input {} needs rank >= 3", x.shape)));
    }
    if p.kernel_shape.is_empty() {
        return Err(OpError::param(op, "kernel_shape is required"));
    }
    let window = Window::resolve(
        op,
        x.rank() - 2,
        p.kernel_shape.clone(),
        &p.pads,
        &p.strides,
        &p.dilations,
        p.auto_pad,
        p.ceil_mode,
    )?;
    let xd = x.dims();
    let mut dims = xd[..2].to_vec();
    dims.extend(window.output_dims(op, &xd[2..])?);
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}

/// Global pools collapse every spatial dim to 1.
pub(super) fn infer_global(op: OpKind, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let x = &inputs[0];
    if x.rank() < 3 {
        return Err(OpError::rank(op, format!("input {} needs rank >= 3", x.shape)));
    }
    let mut dims = x.dims()[..2].to_vec();
    dims.resize(x.rank(), 1);
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}
