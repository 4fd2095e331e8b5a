// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reductions. `axes` moved from attribute to input (ReduceSum at opset
//! 13, the others at 18); both forms are read, the target opset decides
//! which is written.

use super::{AttrBuilder, DecodeContext, Decoded, Encoded, EncodedInput};
use crate::TranslateError;
use model_ir::ops::{ReduceOp, ReduceParams};
use model_ir::{OpKind, Operator};
use tensor_core::Tensor;

fn axes_as_input(op: ReduceOp, opset: i64) -> bool {
    match op {
        ReduceOp::Sum => opset >= 13,
        _ => opset >= 18,
    }
}

pub(super) fn decode(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let op = ReduceOp::from_kind(kind)
        .ok_or_else(|| ctx.unsupported("op_type", format!("{kind} is not a reduction")))?;
    ctx.expect_inputs(1, 2)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown(kind.as_str(), &["axes", "keepdims", "noop_with_empty_axes"]);
    let axes = match attrs.ints("axes")? {
        Some(axes) => {
            if ctx.input_count() > 1 {
                return Err(ctx.unsupported("axes", "given both as attribute and as input"));
            }
            axes.to_vec()
        }
        None => ctx.folded_ints(1, "axes")?.unwrap_or_default(),
    };
    let params = ReduceParams {
        op,
        axes,
        keepdims: attrs.flag("keepdims", true)?,
        noop_with_empty_axes: attrs.flag("noop_with_empty_axes", false)?,
    };
    Ok(Decoded {
        op: Operator::Reduce(params),
        inputs: ctx.data(1)?,
    })
}

pub(super) fn encode(p: &ReduceParams, opset: i64, node: &str) -> Result<Encoded, TranslateError> {
    let mut attrs = AttrBuilder::new().int("keepdims", i64::from(p.keepdims));
    let mut inputs = vec![EncodedInput::Data(0)];
    if axes_as_input(p.op, opset) {
        attrs = attrs.flag_unless("noop_with_empty_axes", p.noop_with_empty_axes, false);
        if !p.axes.is_empty() {
            inputs.push(EncodedInput::Constant {
                role: "axes",
                tensor: Tensor::vector_i64(&p.axes),
            });
        }
    } else {
        if p.noop_with_empty_axes {
            return Err(TranslateError::unsupported_value(
                node,
                "noop_with_empty_axes",
                format!("{} has no noop_with_empty_axes at opset {opset}", p.op.kind()),
            ));
        }
        if !p.axes.is_empty() {
            attrs = attrs.ints("axes", &p.axes);
        }
    }
    Ok(Encoded {
        attributes: attrs.build(),
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::encode as encode_op;
    use super::*;
    use model_ir::ErrorKind;
    use onnx_proto::AttributeProto;
    use tensor_core::DType;

    #[test]
    fn test_axes_attribute() {
        let env = Env::default().value("x", DType::F32, &[2, 3, 4]);
        let d = decode_node(
            &env,
            "ReduceMean",
            &["x"],
            vec![AttributeProto::ints("axes", &[1]), AttributeProto::int("keepdims", 0)],
            13,
        )
        .unwrap();
        let Operator::Reduce(p) = d.op else { panic!() };
        assert_eq!(p.op, ReduceOp::Mean);
        assert_eq!(p.axes, vec![1]);
        assert!(!p.keepdims);
    }

    #[test]
    fn test_axes_input() {
        let env = Env::default()
            .value("x", DType::F32, &[2, 3, 4])
            .constant("ax", Tensor::vector_i64(&[0, 2]));
        let d = decode_node(&env, "ReduceSum", &["x", "ax"], vec![], 18).unwrap();
        assert_eq!(d.inputs, vec!["x"]);
        let Operator::Reduce(p) = d.op else { panic!() };
        assert_eq!(p.op, ReduceOp::Sum);
        assert_eq!(p.axes, vec![0, 2]);
        assert!(p.keepdims);
    }

    #[test]
    fn test_axes_given_twice() {
        let env = Env::default()
            .value("x", DType::F32, &[2, 3])
            .constant("ax", Tensor::vector_i64(&[0]));
        let err = decode_node(
            &env,
            "ReduceMax",
            &["x", "ax"],
            vec![AttributeProto::ints("axes", &[0])],
            18,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
    }

    #[test]
    fn test_encode_follows_opset() {
        let mut p = ReduceParams::new(ReduceOp::Mean);
        p.axes = vec![1];
        let old = encode_op(&Operator::Reduce(p.clone()), 1, 17, "r").unwrap();
        assert_eq!(
            old.attributes,
            vec![AttributeProto::int("keepdims", 1), AttributeProto::ints("axes", &[1])]
        );
        assert_eq!(old.inputs.len(), 1);

        let new = encode_op(&Operator::Reduce(p), 1, 18, "r").unwrap();
        assert_eq!(new.attributes, vec![AttributeProto::int("keepdims", 1)]);
        assert!(matches!(new.inputs[1], EncodedInput::Constant { role: "axes", .. }));
    }

    #[test]
    fn test_noop_needs_axes_input_form() {
        let mut p = ReduceParams::new(ReduceOp::Max);
        p.noop_with_empty_axes = true;
        assert!(encode_op(&Operator::Reduce(p.clone()), 1, 17, "r").is_err());
        let mut sum = p.clone();
        sum.op = ReduceOp::Sum;
        assert!(encode_op(&Operator::Reduce(sum), 1, 13, "r").is_ok());
    }
}
