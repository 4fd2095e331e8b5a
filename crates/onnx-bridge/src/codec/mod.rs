// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operator attribute codecs.
//!
//! A decoder turns a node's attributes and constant operands into an
//! [`Operator`]; an encoder does the reverse for a target opset. Dispatch
//! is a `match` over the closed [`OpKind`] catalog, one family per file.

mod attrs;
mod elementwise;
mod layout;
mod nn;
mod reduce;

pub(crate) use attrs::{AttrBuilder, Attributes};

use crate::TranslateError;
use model_ir::{OpKind, Operator, TensorType};
use onnx_proto::{AttributeProto, NodeProto};
use tensor_core::Tensor;

/// Lookups the decoders need from the surrounding import state.
pub(crate) trait OperandSource {
    /// Returns the embedded value of `name` if it is an initializer or constant.
    fn constant(&self, name: &str) -> Option<&Tensor>;
    /// Returns the resolved type of `name` if it is already defined.
    fn value_type(&self, name: &str) -> Option<&TensorType>;
}

/// Everything a decoder sees about one node.
pub(crate) struct DecodeContext<'a> {
    pub(crate) node: &'a NodeProto,
    /// Node name used in diagnostics; synthesized when the node has none.
    pub(crate) label: &'a str,
    pub(crate) opset: i64,
    pub(crate) src: &'a dyn OperandSource,
}

/// A decoded node: the operator plus the names of its runtime inputs.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub(crate) op: Operator,
    pub(crate) inputs: Vec<String>,
}

/// An encoded node before names are assigned to its operands.
#[derive(Debug)]
pub(crate) struct Encoded {
    pub(crate) attributes: Vec<AttributeProto>,
    pub(crate) inputs: Vec<EncodedInput>,
}

#[derive(Debug)]
pub(crate) enum EncodedInput {
    /// The i-th runtime input of the IR node.
    Data(usize),
    /// A folded parameter re-emitted as an initializer.
    Constant { role: &'static str, tensor: Tensor },
    /// An omitted optional input.
    Absent,
}

impl Encoded {
    fn data(count: usize, attributes: Vec<AttributeProto>) -> Self {
        Self {
            attributes,
            inputs: (0..count).map(EncodedInput::Data).collect(),
        }
    }

    /// Axis-only operators always spell out `axis`; defaults moved across opsets.
    fn with_axis(axis: i64, count: usize) -> Self {
        Self::data(count, AttrBuilder::new().int("axis", axis).build())
    }
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn attrs(&self) -> Attributes<'a> {
        Attributes::new(self.label, &self.node.attribute)
    }

    /// Input count with trailing omitted inputs dropped.
    pub(crate) fn input_count(&self) -> usize {
        trimmed_len(&self.node.input)
    }

    /// Output count with trailing omitted outputs dropped.
    pub(crate) fn output_count(&self) -> usize {
        trimmed_len(&self.node.output)
    }

    /// Name of input `i`, or `None` if it is omitted.
    pub(crate) fn input(&self, i: usize) -> Option<&'a str> {
        self.node
            .input
            .get(i)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn input_type(&self, i: usize) -> Option<&'a TensorType> {
        let src: &'a dyn OperandSource = self.src;
        self.input(i).and_then(|name| src.value_type(name))
    }

    pub(crate) fn expect_inputs(&self, min: usize, max: usize) -> Result<(), TranslateError> {
        let n = self.input_count();
        if n < min || n > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(TranslateError::Arity {
                node: self.label.to_string(),
                detail: format!(
                    "{} expects {expected} input(s), got {n}",
                    self.node.op_type
                ),
            });
        }
        Ok(())
    }

    /// Collects the runtime inputs at positions `0..count`, stopping at the
    /// node's last input. Omitted inputs in that range are an arity error.
    pub(crate) fn data(&self, count: usize) -> Result<Vec<String>, TranslateError> {
        let n = self.input_count().min(count);
        (0..n)
            .map(|i| {
                self.input(i).map(str::to_string).ok_or_else(|| TranslateError::Arity {
                    node: self.label.to_string(),
                    detail: format!("required input {i} of {} is empty", self.node.op_type),
                })
            })
            .collect()
    }

    /// Resolves input `i` as a folded constant operand.
    pub(crate) fn folded(&self, i: usize, role: &str) -> Result<Option<&'a Tensor>, TranslateError> {
        let Some(name) = self.input(i) else {
            return Ok(None);
        };
        let src: &'a dyn OperandSource = self.src;
        match src.constant(name) {
            Some(t) => Ok(Some(t)),
            None => Err(self.unsupported(
                role,
                format!("'{name}' must be a constant initializer, not a runtime value"),
            )),
        }
    }

    /// Resolves input `i` as a folded integer vector.
    pub(crate) fn folded_ints(&self, i: usize, role: &str) -> Result<Option<Vec<i64>>, TranslateError> {
        match self.folded(i, role)? {
            None => Ok(None),
            Some(t) => t
                .to_i64_vec()
                .map(Some)
                .map_err(|e| self.unsupported(role, e.to_string())),
        }
    }

    pub(crate) fn unsupported(&self, attribute: &str, detail: impl Into<String>) -> TranslateError {
        TranslateError::unsupported_value(self.label, attribute, detail)
    }

    fn expect_single_output(&self) -> Result<(), TranslateError> {
        let n = self.output_count();
        if n != 1 {
            return Err(TranslateError::Arity {
                node: self.label.to_string(),
                detail: format!("{} produces 1 output, {n} listed", self.node.op_type),
            });
        }
        Ok(())
    }
}

fn trimmed_len(names: &[String]) -> usize {
    names.iter().rposition(|s| !s.is_empty()).map_or(0, |i| i + 1)
}

/// Decodes one node of catalog kind `kind`.
pub(crate) fn decode(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    let decoded = match kind {
        OpKind::Conv => nn::decode_conv(ctx)?,
        OpKind::Gemm => nn::decode_gemm(ctx)?,
        OpKind::MatMul => nn::decode_matmul(ctx)?,
        OpKind::BatchNormalization => nn::decode_batch_norm(ctx)?,
        OpKind::MaxPool | OpKind::AveragePool => nn::decode_pool(kind, ctx)?,
        OpKind::GlobalAveragePool | OpKind::GlobalMaxPool => nn::decode_global_pool(kind, ctx)?,
        OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div | OpKind::Pow => {
            elementwise::decode_binary(kind, ctx)?
        }
        OpKind::Relu | OpKind::Sigmoid | OpKind::Tanh | OpKind::Abs | OpKind::Identity => {
            elementwise::decode_unary(kind, ctx)?
        }
        OpKind::Softmax => elementwise::decode_softmax(ctx)?,
        OpKind::Where => elementwise::decode_where(ctx)?,
        OpKind::Clip => elementwise::decode_clip(ctx)?,
        OpKind::Flatten => layout::decode_flatten(ctx)?,
        OpKind::Reshape => layout::decode_reshape(ctx)?,
        OpKind::Concat => layout::decode_concat(ctx)?,
        OpKind::Gather | OpKind::GatherElements => layout::decode_gather(kind, ctx)?,
        OpKind::Slice => layout::decode_slice(ctx)?,
        OpKind::Pad => layout::decode_pad(ctx)?,
        OpKind::ReduceMean | OpKind::ReduceMax | OpKind::ReduceMin | OpKind::ReduceSum => {
            reduce::decode(kind, ctx)?
        }
    };
    ctx.expect_single_output()?;
    Ok(decoded)
}

/// Encodes `op` with `data_inputs` runtime inputs for `opset`.
///
/// Fails when the operator's parameters cannot be expressed at that opset.
pub(crate) fn encode(
    op: &Operator,
    data_inputs: usize,
    opset: i64,
    node: &str,
) -> Result<Encoded, TranslateError> {
    let mut encoded = match op {
        Operator::Conv(p) => nn::encode_conv(p, data_inputs),
        Operator::Gemm(p) => nn::encode_gemm(p, data_inputs),
        Operator::MatMul | Operator::GlobalAveragePool | Operator::GlobalMaxPool => {
            Encoded::data(data_inputs, Vec::new())
        }
        Operator::BatchNormalization(p) => nn::encode_batch_norm(p, data_inputs),
        Operator::MaxPool(p) => nn::encode_pool(OpKind::MaxPool, p, opset, node)?,
        Operator::AveragePool(p) => nn::encode_pool(OpKind::AveragePool, p, opset, node)?,
        Operator::Binary(_) | Operator::Unary(_) | Operator::Where => {
            Encoded::data(data_inputs, Vec::new())
        }
        Operator::Softmax { axis } | Operator::Flatten { axis } | Operator::Concat { axis } => {
            Encoded::with_axis(*axis, data_inputs)
        }
        Operator::Gather(p) | Operator::GatherElements(p) => {
            Encoded::with_axis(p.axis, data_inputs)
        }
        Operator::Clip(p) => elementwise::encode_clip(p),
        Operator::Reshape(p) => layout::encode_reshape(p, opset, node)?,
        Operator::Slice(p) => layout::encode_slice(p),
        Operator::Pad(p) => layout::encode_pad(p, opset, node)?,
        Operator::Reduce(p) => reduce::encode(p, opset, node)?,
    };
    while matches!(encoded.inputs.last(), Some(EncodedInput::Absent)) {
        encoded.inputs.pop();
    }
    Ok(encoded)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use model_ir::ErrorKind;
    use onnx_proto::helper::make_node;
    use tensor_core::DType;

    #[test]
    fn test_trailing_empty_inputs_are_omitted() {
        let env = Env::default().value("x", DType::F32, &[1, 3, 4, 4]).value(
            "w",
            DType::F32,
            &[2, 3, 3, 3],
        );
        let d = decode_node(&env, "Conv", &["x", "w", ""], vec![], 18).unwrap();
        assert_eq!(d.inputs, vec!["x", "w"]);
    }

    #[test]
    fn test_too_many_outputs() {
        let env = Env::default().value("x", DType::F32, &[2]);
        let node = make_node("Relu", &["x"], &["y", "z"], "r", vec![]);
        let ctx = DecodeContext {
            node: &node,
            label: "r",
            opset: 18,
            src: &env,
        };
        let err = decode(OpKind::Relu, &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_non_constant_operand() {
        let env = Env::default()
            .value("x", DType::F32, &[2, 3])
            .value("s", DType::I64, &[1]);
        let err = decode_node(&env, "Reshape", &["x", "s"], vec![], 18).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
        assert!(err.to_string().contains("constant initializer"));
    }

    #[test]
    fn test_encode_trims_absent_inputs() {
        let op = Operator::Clip(model_ir::ops::ClipParams {
            min: Some(Tensor::scalar_f32(0.0)),
            max: None,
        });
        let enc = encode(&op, 1, 18, "clip").unwrap();
        assert_eq!(enc.inputs.len(), 2);
        assert!(matches!(enc.inputs[1], EncodedInput::Constant { role: "min", .. }));
    }
}
