// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix products: `MatMul` and the fused `Gemm`.

use super::{OpKind, TensorType};
use crate::OpError;
use tensor_core::Shape;

/// `Y = alpha * A' * B' + beta * C`, where `'` is an optional transpose of
/// the two innermost dims.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GemmParams {
    pub alpha: f32,
    pub beta: f32,
    pub trans_a: bool,
    pub trans_b: bool,
}

impl Default for GemmParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            trans_a: false,
            trans_b: false,
        }
    }
}

/// Broadcasts the batch (leading) dims of two matrices.
fn batch_dims(op: OpKind, a: &[usize], b: &[usize]) -> Result<Vec<usize>, OpError> {
    Shape::from(a)
        .broadcast(&Shape::from(b))
        .map(Shape::into_dims)
        .map_err(|e| OpError::broadcast(op, e))
}

pub(super) fn infer_gemm(p: &GemmParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Gemm;
    let (a, b) = (&inputs[0], &inputs[1]);
    if a.rank() < 2 || b.rank() < 2 {
        return Err(OpError::rank(
            op,
            format!("operands {} and {} need rank >= 2", a.shape, b.shape),
        ));
    }
    super::same_dtype(op, &[a, b])?;

    let (ad, bd) = (a.dims(), b.dims());
    let (ra, rb) = (ad.len(), bd.len());
    let (m, k_a) = if p.trans_a {
        (ad[ra - 1], ad[ra - 2])
    } else {
        (ad[ra - 2], ad[ra - 1])
    };
    let (k_b, n) = if p.trans_b {
        (bd[rb - 1], bd[rb - 2])
    } else {
        (bd[rb - 2], bd[rb - 1])
    };
    if k_a != k_b {
        return Err(OpError::shape(
            op,
            format!("inner dims differ: {} vs {} (A {}, B {})", k_a, k_b, a.shape, b.shape),
        ));
    }

    let mut dims = batch_dims(op, &ad[..ra - 2], &bd[..rb - 2])?;
    dims.extend([m, n]);
    let out = Shape::new(dims);

    if let Some(c) = inputs.get(2) {
        super::same_dtype(op, &[a, c])?;
        if !c.shape.broadcasts_to(&out) {
            return Err(OpError::shape(
                op,
                format!("bias {} does not broadcast to {out}", c.shape),
            ));
        }
    }
    Ok(TensorType::new(a.dtype, out))
}

/// Matrix product with numpy semantics: 1-D operands are promoted and the
/// promoted dim removed again; batch dims broadcast.
pub(super) fn infer_matmul(inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::MatMul;
    let (a, b) = (&inputs[0], &inputs[1]);
    if a.rank() == 0 || b.rank() == 0 {
        return Err(OpError::rank(op, "scalar operands are not allowed"));
    }
    super::same_dtype(op, &[a, b])?;

    let mut ad = a.dims().to_vec();
    let mut bd = b.dims().to_vec();
    let a_vec = ad.len() == 1;
    let b_vec = bd.len() == 1;
    if a_vec {
        ad.insert(0, 1);
    }
    if b_vec {
        bd.push(1);
    }
    let (ra, rb) = (ad.len(), bd.len());
    if ad[ra - 1] != bd[rb - 2] {
        return Err(OpError::shape(
            op,
            format!("inner dims differ: {} x {}", a.shape, b.shape),
        ));
    }

    let mut dims = batch_dims(op, &ad[..ra - 2], &bd[..rb - 2])?;
    if !a_vec {
        dims.push(ad[ra - 2]);
    }
    if !b_vec {
        dims.push(bd[rb - 1]);
    }
    Ok(TensorType::new(a.dtype, Shape::new(dims)))
}
