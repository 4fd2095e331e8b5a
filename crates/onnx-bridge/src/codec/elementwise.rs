// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise, activation and selection operators.

use super::{DecodeContext, Decoded, Encoded, EncodedInput};
use crate::payload::scalar_like;
use crate::TranslateError;
use model_ir::ops::{BinaryOp, ClipParams, UnaryOp};
use model_ir::{OpKind, Operator};
use tensor_core::Tensor;
use tracing::warn;

pub(super) fn decode_binary(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(2, 2)?;
    ctx.attrs().warn_unknown(kind.as_str(), &[]);
    let op = BinaryOp::from_kind(kind)
        .ok_or_else(|| ctx.unsupported("op_type", format!("{kind} is not a binary operator")))?;
    Ok(Decoded {
        op: Operator::Binary(op),
        inputs: ctx.data(2)?,
    })
}

pub(super) fn decode_unary(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, 1)?;
    ctx.attrs().warn_unknown(kind.as_str(), &[]);
    let op = UnaryOp::from_kind(kind)
        .ok_or_else(|| ctx.unsupported("op_type", format!("{kind} is not a unary operator")))?;
    Ok(Decoded {
        op: Operator::Unary(op),
        inputs: ctx.data(1)?,
    })
}

/// Softmax's default axis moved from 1 to -1 in opset 13.
pub(super) fn decode_softmax(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, 1)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown("Softmax", &["axis"]);
    let default_axis = if ctx.opset < 13 { 1 } else { -1 };
    Ok(Decoded {
        op: Operator::Softmax {
            axis: attrs.int_or("axis", default_axis)?,
        },
        inputs: ctx.data(1)?,
    })
}

pub(super) fn decode_where(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(3, 3)?;
    ctx.attrs().warn_unknown("Where", &[]);
    Ok(Decoded {
        op: Operator::Where,
        inputs: ctx.data(3)?,
    })
}

/// Clip bounds are constant operands from opset 11, float attributes before.
pub(super) fn decode_clip(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let attrs = ctx.attrs();
    let legacy = attrs.has("min") || attrs.has("max");
    let params = if legacy {
        ctx.expect_inputs(1, 1)?;
        warn!(node = ctx.label, "reading Clip bounds from attributes");
        let dtype = ctx
            .input_type(0)
            .map(|t| t.dtype)
            .ok_or_else(|| ctx.unsupported("input", "type of Clip input is unknown"))?;
        let bound = |name: &str| -> Result<Option<Tensor>, TranslateError> {
            match attrs.float(name)? {
                None => Ok(None),
                Some(v) => scalar_like(f64::from(v), dtype)
                    .map(Some)
                    .ok_or_else(|| ctx.unsupported(name, format!("cannot express {v} as {dtype}"))),
            }
        };
        ClipParams {
            min: bound("min")?,
            max: bound("max")?,
        }
    } else {
        ctx.expect_inputs(1, 3)?;
        ClipParams {
            min: ctx.folded(1, "min")?.cloned(),
            max: ctx.folded(2, "max")?.cloned(),
        }
    };
    attrs.warn_unknown("Clip", &["min", "max"]);
    Ok(Decoded {
        op: Operator::Clip(params),
        inputs: ctx.data(1)?,
    })
}

pub(super) fn encode_clip(p: &ClipParams) -> Encoded {
    let operand = |role: &'static str, t: &Option<Tensor>| match t {
        Some(tensor) => EncodedInput::Constant {
            role,
            tensor: tensor.clone(),
        },
        None => EncodedInput::Absent,
    };
    Encoded {
        attributes: Vec::new(),
        inputs: vec![
            EncodedInput::Data(0),
            operand("min", &p.min),
            operand("max", &p.max),
        ],
    }
}
