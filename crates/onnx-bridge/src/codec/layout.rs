// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape-manipulating and indexing operators.
//!
//! Reshape targets, slice bounds and pad amounts arrive as constant
//! operands (or as attributes in older opsets) and are folded into the
//! parameter record. On export they become initializers again.

use super::{AttrBuilder, DecodeContext, Decoded, Encoded, EncodedInput};
use crate::payload::scalar_like;
use crate::TranslateError;
use model_ir::ops::{GatherParams, PadMode, PadParams, ReshapeParams, SliceParams};
use model_ir::{OpKind, Operator};
use tensor_core::Tensor;
use tracing::warn;

/// Reads a folded integer operand the operator cannot do without.
fn required_ints(ctx: &DecodeContext<'_>, i: usize, role: &str) -> Result<Vec<i64>, TranslateError> {
    ctx.folded_ints(i, role)?.ok_or_else(|| TranslateError::Arity {
        node: ctx.label.to_string(),
        detail: format!("required input '{role}' of {} is empty", ctx.node.op_type),
    })
}

pub(super) fn decode_flatten(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, 1)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown("Flatten", &["axis"]);
    Ok(Decoded {
        op: Operator::Flatten {
            axis: attrs.int_or("axis", 1)?,
        },
        inputs: ctx.data(1)?,
    })
}

pub(super) fn decode_reshape(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let attrs = ctx.attrs();
    attrs.warn_unknown("Reshape", &["allowzero", "shape"]);
    let shape = match attrs.ints("shape")? {
        Some(shape) => {
            ctx.expect_inputs(1, 1)?;
            warn!(node = ctx.label, "reading Reshape target from the shape attribute");
            shape.to_vec()
        }
        None => {
            ctx.expect_inputs(2, 2)?;
            required_ints(ctx, 1, "shape")?
        }
    };
    Ok(Decoded {
        op: Operator::Reshape(ReshapeParams {
            shape,
            allowzero: attrs.flag("allowzero", false)?,
        }),
        inputs: ctx.data(1)?,
    })
}

pub(super) fn decode_concat(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, usize::MAX)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown("Concat", &["axis"]);
    Ok(Decoded {
        op: Operator::Concat {
            axis: attrs.require_int("axis")?,
        },
        inputs: ctx.data(usize::MAX)?,
    })
}

pub(super) fn decode_gather(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(2, 2)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown(kind.as_str(), &["axis"]);
    let params = GatherParams {
        axis: attrs.int_or("axis", 0)?,
    };
    let op = if kind == OpKind::GatherElements {
        Operator::GatherElements(params)
    } else {
        Operator::Gather(params)
    };
    Ok(Decoded {
        op,
        inputs: ctx.data(2)?,
    })
}

/// Slice bounds are constant operands from opset 10, attributes before.
pub(super) fn decode_slice(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let attrs = ctx.attrs();
    attrs.warn_unknown("Slice", &["starts", "ends", "axes"]);
    let params = if attrs.has("starts") {
        ctx.expect_inputs(1, 1)?;
        warn!(node = ctx.label, "reading Slice bounds from attributes");
        SliceParams {
            starts: attrs.require_ints("starts")?.to_vec(),
            ends: attrs.require_ints("ends")?.to_vec(),
            axes: attrs.ints("axes")?.map(<[i64]>::to_vec).unwrap_or_default(),
            steps: Vec::new(),
        }
    } else {
        ctx.expect_inputs(3, 5)?;
        SliceParams {
            starts: required_ints(ctx, 1, "starts")?,
            ends: required_ints(ctx, 2, "ends")?,
            axes: ctx.folded_ints(3, "axes")?.unwrap_or_default(),
            steps: ctx.folded_ints(4, "steps")?.unwrap_or_default(),
        }
    };
    Ok(Decoded {
        op: Operator::Slice(params),
        inputs: ctx.data(1)?,
    })
}

/// Pad amounts are constant operands from opset 11, attributes before.
pub(super) fn decode_pad(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let attrs = ctx.attrs();
    attrs.warn_unknown("Pad", &["mode", "pads", "value"]);
    let mode = match attrs.string("mode")? {
        None => PadMode::Constant,
        Some("wrap") => return Err(ctx.unsupported("mode", "wrap padding is not supported")),
        Some(s) => {
            PadMode::from_name(s).ok_or_else(|| ctx.unsupported("mode", format!("unknown mode '{s}'")))?
        }
    };
    let params = if let Some(pads) = attrs.ints("pads")? {
        ctx.expect_inputs(1, 1)?;
        warn!(node = ctx.label, "reading Pad amounts from attributes");
        let constant_value = match attrs.float("value")? {
            None => None,
            Some(v) => {
                let dtype = ctx
                    .input_type(0)
                    .map(|t| t.dtype)
                    .ok_or_else(|| ctx.unsupported("value", "type of Pad input is unknown"))?;
                let t = scalar_like(f64::from(v), dtype)
                    .ok_or_else(|| ctx.unsupported("value", format!("cannot express {v} as {dtype}")))?;
                Some(t)
            }
        };
        PadParams {
            pads: pads.to_vec(),
            mode,
            constant_value,
            axes: Vec::new(),
        }
    } else {
        ctx.expect_inputs(2, 4)?;
        PadParams {
            pads: required_ints(ctx, 1, "pads")?,
            mode,
            constant_value: ctx.folded(2, "constant_value")?.cloned(),
            axes: ctx.folded_ints(3, "axes")?.unwrap_or_default(),
        }
    };
    Ok(Decoded {
        op: Operator::Pad(params),
        inputs: ctx.data(1)?,
    })
}

fn ints_operand(role: &'static str, values: &[i64]) -> EncodedInput {
    EncodedInput::Constant {
        role,
        tensor: Tensor::vector_i64(values),
    }
}

pub(super) fn encode_reshape(p: &ReshapeParams, opset: i64, node: &str) -> Result<Encoded, TranslateError> {
    if p.allowzero && opset < 14 {
        return Err(TranslateError::unsupported_value(
            node,
            "allowzero",
            format!("allowzero needs opset 14, targeting {opset}"),
        ));
    }
    Ok(Encoded {
        attributes: AttrBuilder::new().flag_unless("allowzero", p.allowzero, false).build(),
        inputs: vec![EncodedInput::Data(0), ints_operand("shape", &p.shape)],
    })
}

pub(super) fn encode_slice(p: &SliceParams) -> Encoded {
    let mut inputs = vec![
        EncodedInput::Data(0),
        ints_operand("starts", &p.starts),
        ints_operand("ends", &p.ends),
    ];
    // An empty name skips axes when steps follow it.
    inputs.push(if p.axes.is_empty() {
        EncodedInput::Absent
    } else {
        ints_operand("axes", &p.axes)
    });
    if !p.steps.is_empty() {
        inputs.push(ints_operand("steps", &p.steps));
    }
    Encoded {
        attributes: Vec::new(),
        inputs,
    }
}

pub(super) fn encode_pad(p: &PadParams, opset: i64, node: &str) -> Result<Encoded, TranslateError> {
    if !p.axes.is_empty() && opset < 18 {
        return Err(TranslateError::unsupported_value(
            node,
            "axes",
            format!("Pad axes need opset 18, targeting {opset}"),
        ));
    }
    let constant_value = match &p.constant_value {
        Some(t) => EncodedInput::Constant {
            role: "constant_value",
            tensor: t.clone(),
        },
        None => EncodedInput::Absent,
    };
    let axes = if p.axes.is_empty() {
        EncodedInput::Absent
    } else {
        ints_operand("axes", &p.axes)
    };
    Ok(Encoded {
        attributes: AttrBuilder::new()
            .string_unless("mode", p.mode.as_str(), PadMode::Constant.as_str())
            .build(),
        inputs: vec![
            EncodedInput::Data(0),
            ints_operand("pads", &p.pads),
            constant_value,
            axes,
        ],
    })
}
