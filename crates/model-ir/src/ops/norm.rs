// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{OpKind, TensorType};
use crate::OpError;

/// Inference-mode batch normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchNormParams {
    pub epsilon: f32,
    pub momentum: f32,
}

impl Default for BatchNormParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            momentum: 0.9,
        }
    }
}

/// Inputs are `X, scale, B, input_mean, input_var`; each statistic must hold
/// one value per channel.
pub(super) fn infer(_p: &BatchNormParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::BatchNormalization;
    let x = &inputs[0];
    if x.rank() < 2 {
        return Err(OpError::rank(op, format!("input {} needs rank >= 2", x.shape)));
    }
    let channels = x.dims()[1];
    for (role, t) in ["scale", "B", "input_mean", "input_var"].iter().zip(&inputs[1..]) {
        if t.shape.num_elements() != channels {
            return Err(OpError::shape(
                op,
                format!("{role} {} must hold {channels} values", t.shape),
            ));
        }
        if !t.dtype.is_float() {
            return Err(OpError::dtype(op, format!("{role} has dtype {}", t.dtype)));
        }
    }
    Ok(x.clone())
}
