// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution, pooling, dense and normalization operators.

use super::{AttrBuilder, Attributes, DecodeContext, Decoded, Encoded};
use crate::TranslateError;
use model_ir::ops::{AutoPad, BatchNormParams, ConvParams, GemmParams, PoolParams};
use model_ir::{OpKind, Operator};
use tracing::{debug, warn};

const CONV_ATTRS: &[&str] = &["kernel_shape", "pads", "strides", "dilations", "group", "auto_pad"];
const POOL_ATTRS: &[&str] = &[
    "kernel_shape",
    "pads",
    "strides",
    "dilations",
    "auto_pad",
    "ceil_mode",
    "count_include_pad",
    "storage_order",
];

fn auto_pad(ctx: &DecodeContext<'_>, attrs: &Attributes<'_>) -> Result<AutoPad, TranslateError> {
    match attrs.string("auto_pad")? {
        None => Ok(AutoPad::NotSet),
        Some(s) => AutoPad::from_name(s)
            .ok_or_else(|| ctx.unsupported("auto_pad", format!("unknown policy '{s}'"))),
    }
}

/// Reads `pads`, expanding the symmetric shorthand (one value per spatial
/// axis) some exporters write into the begin/end form.
fn pads(ctx: &DecodeContext<'_>, attrs: &Attributes<'_>) -> Result<Vec<usize>, TranslateError> {
    let pads = attrs.sizes_or_empty("pads")?;
    let spatial = ctx.input_type(0).map(|t| t.rank().saturating_sub(2));
    match spatial {
        Some(n) if n > 0 && pads.len() == n => {
            warn!(node = ctx.label, ?pads, "expanding symmetric pads shorthand");
            Ok(pads.iter().chain(pads.iter()).copied().collect())
        }
        _ => Ok(pads),
    }
}

pub(super) fn decode_conv(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(2, 3)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown("Conv", CONV_ATTRS);
    let group = attrs.int_or("group", 1)?;
    if group < 1 {
        return Err(ctx.unsupported("group", format!("must be >= 1, got {group}")));
    }
    let params = ConvParams {
        kernel_shape: attrs.positive_sizes("kernel_shape")?,
        pads: pads(ctx, &attrs)?,
        strides: attrs.positive_sizes("strides")?,
        dilations: attrs.positive_sizes("dilations")?,
        group: group as usize,
        auto_pad: auto_pad(ctx, &attrs)?,
    };
    Ok(Decoded {
        op: Operator::Conv(params),
        inputs: ctx.data(3)?,
    })
}

pub(super) fn decode_pool(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, 1)?;
    if kind == OpKind::MaxPool && ctx.output_count() > 1 {
        return Err(ctx.unsupported("Indices", "the argmax output of MaxPool is not supported"));
    }
    let attrs = ctx.attrs();
    attrs.warn_unknown(kind.as_str(), POOL_ATTRS);
    attrs.require_ints("kernel_shape")?;
    if attrs.int_or("storage_order", 0)? != 0 {
        warn!(node = ctx.label, "storage_order only affects Indices, ignored");
    }
    let params = PoolParams {
        kernel_shape: attrs.positive_sizes("kernel_shape")?,
        pads: pads(ctx, &attrs)?,
        strides: attrs.positive_sizes("strides")?,
        dilations: attrs.positive_sizes("dilations")?,
        auto_pad: auto_pad(ctx, &attrs)?,
        ceil_mode: attrs.flag("ceil_mode", false)?,
        count_include_pad: attrs.flag("count_include_pad", false)?,
    };
    let op = if kind == OpKind::MaxPool {
        Operator::MaxPool(params)
    } else {
        Operator::AveragePool(params)
    };
    Ok(Decoded {
        op,
        inputs: ctx.data(1)?,
    })
}

pub(super) fn decode_global_pool(kind: OpKind, ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(1, 1)?;
    ctx.attrs().warn_unknown(kind.as_str(), &[]);
    let op = if kind == OpKind::GlobalMaxPool {
        Operator::GlobalMaxPool
    } else {
        Operator::GlobalAveragePool
    };
    Ok(Decoded {
        op,
        inputs: ctx.data(1)?,
    })
}

pub(super) fn decode_gemm(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(2, 3)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown("Gemm", &["alpha", "beta", "transA", "transB", "broadcast"]);
    let params = GemmParams {
        alpha: attrs.float_or("alpha", 1.0)?,
        beta: attrs.float_or("beta", 1.0)?,
        trans_a: attrs.flag("transA", false)?,
        trans_b: attrs.flag("transB", false)?,
    };
    Ok(Decoded {
        op: Operator::Gemm(params),
        inputs: ctx.data(3)?,
    })
}

pub(super) fn decode_matmul(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(2, 2)?;
    ctx.attrs().warn_unknown("MatMul", &[]);
    Ok(Decoded {
        op: Operator::MatMul,
        inputs: ctx.data(2)?,
    })
}

pub(super) fn decode_batch_norm(ctx: &DecodeContext<'_>) -> Result<Decoded, TranslateError> {
    ctx.expect_inputs(5, 5)?;
    let attrs = ctx.attrs();
    attrs.warn_unknown(
        "BatchNormalization",
        &["epsilon", "momentum", "training_mode", "spatial"],
    );
    if attrs.flag("training_mode", false)? {
        return Err(ctx.unsupported("training_mode", "training mode is not supported"));
    }
    if ctx.output_count() > 1 {
        return Err(ctx.unsupported(
            "outputs",
            "running mean/var outputs are only produced in training mode",
        ));
    }
    let params = BatchNormParams {
        epsilon: attrs.float_or("epsilon", 1e-5)?,
        momentum: attrs.float_or("momentum", 0.9)?,
    };
    Ok(Decoded {
        op: Operator::BatchNormalization(params),
        inputs: ctx.data(5)?,
    })
}

pub(super) fn encode_conv(p: &ConvParams, data_inputs: usize) -> Encoded {
    let attrs = AttrBuilder::new()
        .sizes("kernel_shape", &p.kernel_shape)
        .sizes("pads", &p.pads)
        .sizes("strides", &p.strides)
        .sizes("dilations", &p.dilations)
        .int_unless("group", p.group as i64, 1)
        .string_unless("auto_pad", p.auto_pad.as_str(), AutoPad::NotSet.as_str())
        .build();
    Encoded::data(data_inputs, attrs)
}

pub(super) fn encode_pool(
    kind: OpKind,
    p: &PoolParams,
    opset: i64,
    node: &str,
) -> Result<Encoded, TranslateError> {
    // AveragePool gained dilations in opset 19.
    let dilated = p.dilations.iter().any(|&d| d != 1);
    let dilations: &[usize] = if kind == OpKind::AveragePool && opset < 19 {
        if dilated {
            return Err(TranslateError::unsupported_value(
                node,
                "dilations",
                format!("AveragePool dilations need opset 19, targeting {opset}"),
            ));
        }
        if !p.dilations.is_empty() {
            debug!(node, "unit AveragePool dilations omitted below opset 19");
        }
        &[]
    } else {
        &p.dilations
    };
    let mut attrs = AttrBuilder::new()
        .sizes("kernel_shape", &p.kernel_shape)
        .sizes("pads", &p.pads)
        .sizes("strides", &p.strides)
        .sizes("dilations", dilations)
        .string_unless("auto_pad", p.auto_pad.as_str(), AutoPad::NotSet.as_str())
        .flag_unless("ceil_mode", p.ceil_mode, false);
    if kind == OpKind::AveragePool {
        attrs = attrs.flag_unless("count_include_pad", p.count_include_pad, false);
    }
    Ok(Encoded::data(1, attrs.build()))
}

pub(super) fn encode_gemm(p: &GemmParams, data_inputs: usize) -> Encoded {
    let attrs = AttrBuilder::new()
        .float_unless("alpha", p.alpha, 1.0)
        .float_unless("beta", p.beta, 1.0)
        .flag_unless("transA", p.trans_a, false)
        .flag_unless("transB", p.trans_b, false)
        .build();
    Encoded::data(data_inputs, attrs)
}

pub(super) fn encode_batch_norm(p: &BatchNormParams, data_inputs: usize) -> Encoded {
    let attrs = AttrBuilder::new()
        .float("epsilon", p.epsilon)
        .float("momentum", p.momentum)
        .build();
    Encoded::data(data_inputs, attrs)
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{encode, EncodedInput};
    use super::*;
    use model_ir::{ErrorKind, TensorType};
    use onnx_proto::AttributeProto;
    use tensor_core::{DType, Shape};

    fn conv_env() -> Env {
        Env::default()
            .value("x", DType::F32, &[1, 3, 4, 4])
            .value("w", DType::F32, &[2, 3, 3, 3])
    }

    #[test]
    fn test_conv_decode() {
        let d = decode_node(
            &conv_env(),
            "Conv",
            &["x", "w"],
            vec![
                AttributeProto::ints("pads", &[1, 1, 1, 1]),
                AttributeProto::ints("strides", &[2, 1]),
                AttributeProto::ints("dilations", &[1, 2]),
            ],
            18,
        )
        .unwrap();
        let Operator::Conv(p) = d.op else {
            panic!("expected Conv, got {:?}", d.op);
        };
        assert_eq!(p.pads, vec![1, 1, 1, 1]);
        assert_eq!(p.strides, vec![2, 1]);
        assert_eq!(p.dilations, vec![1, 2]);
        assert_eq!(p.group, 1);
        assert_eq!(p.auto_pad, AutoPad::NotSet);
    }

    #[test]
    fn test_conv_symmetric_pads_shorthand() {
        let d = decode_node(
            &conv_env(),
            "Conv",
            &["x", "w"],
            vec![AttributeProto::ints("pads", &[1, 1])],
            18,
        )
        .unwrap();
        let Operator::Conv(p) = d.op else { panic!() };
        assert_eq!(p.pads, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_conv_rejects_zero_stride_and_bad_auto_pad() {
        let err = decode_node(
            &conv_env(),
            "Conv",
            &["x", "w"],
            vec![AttributeProto::ints("strides", &[0, 1])],
            18,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);

        let err = decode_node(
            &conv_env(),
            "Conv",
            &["x", "w"],
            vec![AttributeProto::string("auto_pad", "SAME_MIDDLE")],
            18,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
        assert!(err.to_string().contains("SAME_MIDDLE"));
    }

    #[test]
    fn test_conv_arity() {
        let err = decode_node(&conv_env(), "Conv", &["x"], vec![], 18).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_pool_requires_kernel_shape() {
        let env = Env::default().value("x", DType::F32, &[1, 64, 162, 162]);
        let err = decode_node(&env, "MaxPool", &["x"], vec![], 18).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeMissing);
        assert!(err.to_string().contains("kernel_shape"));
    }

    #[test]
    fn test_average_pool_flags() {
        let env = Env::default().value("x", DType::F32, &[1, 64, 162, 162]);
        let d = decode_node(
            &env,
            "AveragePool",
            &["x"],
            vec![
                AttributeProto::ints("kernel_shape", &[3, 3]),
                AttributeProto::ints("strides", &[2, 2]),
                AttributeProto::ints("pads", &[0, 0]),
                AttributeProto::int("count_include_pad", 1),
            ],
            18,
        )
        .unwrap();
        let Operator::AveragePool(p) = d.op else { panic!() };
        assert_eq!(p.kernel_shape, vec![3, 3]);
        assert_eq!(p.pads, vec![0, 0, 0, 0]);
        assert!(p.count_include_pad);
        assert!(!p.ceil_mode);
    }

    #[test]
    fn test_gemm_attributes() {
        let env = Env::default()
            .value("a", DType::F32, &[2, 3])
            .value("b", DType::F32, &[4, 3]);
        let d = decode_node(
            &env,
            "Gemm",
            &["a", "b"],
            vec![AttributeProto::int("transB", 1), AttributeProto::float("alpha", 0.5)],
            18,
        )
        .unwrap();
        let Operator::Gemm(p) = d.op else { panic!() };
        assert!(p.trans_b);
        assert!(!p.trans_a);
        assert_eq!(p.alpha, 0.5);
        assert_eq!(p.beta, 1.0);

        let enc = encode(&Operator::Gemm(p), 2, 18, "gemm").unwrap();
        assert_eq!(
            enc.attributes,
            vec![AttributeProto::float("alpha", 0.5), AttributeProto::int("transB", 1)]
        );
    }

    #[test]
    fn test_batch_norm_training_mode() {
        let env = Env::default().value("x", DType::F32, &[1, 3, 2, 2]);
        let inputs = ["x", "s", "b", "m", "v"];
        let err = decode_node(
            &env,
            "BatchNormalization",
            &inputs,
            vec![AttributeProto::int("training_mode", 1)],
            18,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
        assert!(err.to_string().contains("training_mode"));
    }

    #[test]
    fn test_encode_conv_omits_defaults() {
        let enc = encode(&Operator::Conv(ConvParams::default()), 2, 18, "conv").unwrap();
        assert!(enc.attributes.is_empty());
        assert!(matches!(enc.inputs[..], [EncodedInput::Data(0), EncodedInput::Data(1)]));
    }

    #[test]
    fn test_encode_average_pool_dilations_need_opset_19() {
        let p = PoolParams {
            kernel_shape: vec![2, 2],
            dilations: vec![2, 2],
            ..Default::default()
        };
        let err = encode(&Operator::AveragePool(p.clone()), 1, 18, "pool").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
        assert!(encode(&Operator::AveragePool(p), 1, 19, "pool").is_ok());
    }

    #[test]
    fn test_unit_average_pool_dilations_omitted() {
        let p = PoolParams {
            kernel_shape: vec![2, 2],
            dilations: vec![1, 1],
            ..Default::default()
        };
        let enc = encode(&Operator::AveragePool(p.clone()), 1, 18, "pool").unwrap();
        assert!(enc.attributes.iter().all(|a| a.name != "dilations"));

        let env = Env::default().value("x", DType::F32, &[1, 3, 8, 8]);
        let d = decode_node(&env, "AveragePool", &["x"], enc.attributes, 18).unwrap();
        let Operator::AveragePool(back) = &d.op else { panic!() };
        assert!(back.dilations.is_empty());
        let x = [TensorType::new(DType::F32, Shape::new(vec![1, 3, 8, 8]))];
        assert_eq!(
            d.op.infer(&x).unwrap(),
            Operator::AveragePool(p.clone()).infer(&x).unwrap()
        );

        let enc = encode(&Operator::AveragePool(p.clone()), 1, 19, "pool").unwrap();
        let d = decode_node(&env, "AveragePool", &["x"], enc.attributes, 19).unwrap();
        assert_eq!(d.op, Operator::AveragePool(p));
    }
}
