// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-to-end translation of small single-operator and multi-operator models.

use model_ir::ops::{
    AutoPad, BatchNormParams, BinaryOp, ClipParams, ConvParams, GatherParams, GemmParams, PadMode,
    PadParams, PoolParams, ReduceOp, ReduceParams, ReshapeParams, SliceParams, UnaryOp,
};
use model_ir::{Complete, ErrorKind, ModelGraph, OpKind, Operator, TensorType};
use onnx_bridge::{
    export, import, BridgeConfig, ExportConfig, GraphHandler, ImportConfig, NullRuntime,
    TranslateError, Translator,
};
use onnx_proto::helper::{
    make_graph, make_model, make_node, make_opsetid, make_tensor_f32, make_tensor_i64,
    make_tensor_raw, make_tensor_value_info,
};
use onnx_proto::{AttributeProto, DataType, ModelProto, NodeProto, TensorProto, ValueInfoProto};
use tensor_core::{DType, Tensor};

// ── helpers ────────────────────────────────────────────────────────

fn vi(name: &str, dt: DataType, dims: &[i64]) -> ValueInfoProto {
    make_tensor_value_info(name, dt, dims)
}

fn model(nodes: Vec<NodeProto>, inputs: Vec<ValueInfoProto>, outputs: Vec<ValueInfoProto>, inits: Vec<TensorProto>) -> ModelProto {
    make_model(make_graph(nodes, "test", inputs, outputs, inits))
}

fn load(m: &ModelProto) -> Result<ModelGraph<Complete>, TranslateError> {
    import(m, &ImportConfig::default(), &NullRuntime)
}

/// Imports a model and returns the type of its first output.
fn output_type(m: &ModelProto) -> TensorType {
    let g = load(m).unwrap();
    g.tensor_type(g.outputs()[0]).unwrap().clone()
}

fn u32_raw(name: &str, values: &[u32]) -> TensorProto {
    let raw = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    make_tensor_raw(name, DataType::Uint32, &[values.len() as i64], raw)
}

fn single(op: &str, inputs: &[&str], attrs: Vec<AttributeProto>) -> Vec<NodeProto> {
    vec![make_node(op, inputs, &["Y"], "", attrs)]
}

// ── passthrough and nn operators ───────────────────────────────────

#[test]
fn test_input_passthrough() {
    let m = model(
        vec![],
        vec![vi("X", DataType::Float, &[2, 3])],
        vec![vi("X", DataType::Float, &[2, 3])],
        vec![],
    );
    let g = load(&m).unwrap();
    assert_eq!(g.num_nodes(), 0);
    assert_eq!(g.inputs(), g.outputs());
}

#[test]
fn test_conv_with_spatial_pads() {
    let m = model(
        single(
            "Conv",
            &["X", "W"],
            vec![
                AttributeProto::ints("kernel_shape", &[3, 3]),
                AttributeProto::ints("pads", &[1, 1]),
            ],
        ),
        vec![vi("X", DataType::Float, &[1, 1, 5, 5]), vi("W", DataType::Float, &[1, 1, 3, 3])],
        vec![vi("Y", DataType::Float, &[1, 1, 5, 5])],
        vec![],
    );
    assert_eq!(output_type(&m), TensorType::new(DType::F32, [1, 1, 5, 5]));
}

#[test]
fn test_batched_matmul() {
    let m = model(
        single("MatMul", &["A", "B"], vec![]),
        vec![vi("A", DataType::Float, &[1, 2, 3]), vi("B", DataType::Float, &[1, 3, 4])],
        vec![vi("Y", DataType::Float, &[1, 2, 4])],
        vec![],
    );
    assert_eq!(output_type(&m).dims(), &[1, 2, 4]);
}

#[test]
fn test_gemm_trans_b() {
    let m = model(
        single("Gemm", &["A", "B", "C"], vec![AttributeProto::int("transB", 1)]),
        vec![vi("A", DataType::Float, &[2, 3]), vi("B", DataType::Float, &[4, 3])],
        vec![vi("Y", DataType::Float, &[2, 4])],
        vec![make_tensor_f32("C", &[4], &[0.0; 4])],
    );
    assert_eq!(output_type(&m).dims(), &[2, 4]);
}

#[test]
fn test_batch_norm_integer_input() {
    let stats = |name: &str| make_tensor_f32(name, &[1, 3, 1, 1], &[1.0, 1.0, 1.0]);
    let m = model(
        single("BatchNormalization", &["X", "scale", "B", "mean", "var"], vec![]),
        vec![vi("X", DataType::Uint32, &[1, 3, 2, 2])],
        vec![vi("Y", DataType::Uint32, &[1, 3, 2, 2])],
        vec![stats("scale"), stats("B"), stats("mean"), stats("var")],
    );
    assert_eq!(output_type(&m), TensorType::new(DType::U32, [1, 3, 2, 2]));
}

#[test]
fn test_max_and_average_pool() {
    for op in ["MaxPool", "AveragePool"] {
        let m = model(
            single(
                op,
                &["X"],
                vec![
                    AttributeProto::ints("kernel_shape", &[3, 3]),
                    AttributeProto::ints("strides", &[2, 2]),
                    AttributeProto::ints("pads", &[0, 0]),
                ],
            ),
            vec![vi("X", DataType::Uint32, &[1, 64, 162, 162])],
            vec![vi("Y", DataType::Uint32, &[1, 64, 80, 80])],
            vec![],
        );
        assert_eq!(output_type(&m).dims(), &[1, 64, 80, 80], "{op}");
    }
}

#[test]
fn test_global_average_pool() {
    let m = model(
        single("GlobalAveragePool", &["X"], vec![]),
        vec![vi("X", DataType::Float, &[1, 3, 5, 5])],
        vec![vi("Y", DataType::Float, &[1, 3, 1, 1])],
        vec![],
    );
    assert_eq!(output_type(&m).dims(), &[1, 3, 1, 1]);
}

// ── elementwise ────────────────────────────────────────────────────

#[test]
fn test_binary_operators_broadcast() {
    for op in ["Add", "Sub", "Mul", "Div", "Pow"] {
        let m = model(
            single(op, &["A", "B"], vec![]),
            vec![vi("A", DataType::Float, &[2, 3, 4]), vi("B", DataType::Float, &[4])],
            vec![vi("Y", DataType::Float, &[2, 3, 4])],
            vec![],
        );
        let g = load(&m).unwrap();
        assert_eq!(g.nodes()[0].kind().as_str(), op);
        assert_eq!(g.tensor_type(g.outputs()[0]).unwrap().dims(), &[2, 3, 4]);
    }
}

#[test]
fn test_unary_operators_keep_type() {
    for op in ["Relu", "Sigmoid", "Tanh", "Softmax", "Abs", "Identity"] {
        let m = model(
            single(op, &["X"], vec![]),
            vec![vi("X", DataType::Float, &[2, 5])],
            vec![vi("Y", DataType::Float, &[2, 5])],
            vec![],
        );
        assert_eq!(output_type(&m), TensorType::new(DType::F32, [2, 5]), "{op}");
    }
}

// ── layout ─────────────────────────────────────────────────────────

#[test]
fn test_flatten() {
    let m = model(
        single("Flatten", &["X"], vec![]),
        vec![vi("X", DataType::Float, &[1, 3, 5, 7])],
        vec![vi("Y", DataType::Float, &[1, 105])],
        vec![],
    );
    assert_eq!(output_type(&m).dims(), &[1, 105]);
}

#[test]
fn test_reshape_shape_listed_as_input() {
    // The target shape is an initializer that is also declared as a graph input.
    let m = model(
        single("Reshape", &["X", "shape"], vec![]),
        vec![vi("X", DataType::Float, &[2, 3, 4, 5]), vi("shape", DataType::Int64, &[3])],
        vec![vi("Y", DataType::Float, &[5, 3, 8])],
        vec![make_tensor_i64("shape", &[3], &[5, 3, 8])],
    );
    let g = load(&m).unwrap();
    assert_eq!(g.inputs().len(), 1);
    assert_eq!(g.tensor_type(g.outputs()[0]).unwrap().dims(), &[5, 3, 8]);
}

#[test]
fn test_reshape_count_mismatch() {
    let m = model(
        single("Reshape", &["X", "shape"], vec![]),
        vec![vi("X", DataType::Float, &[2, 3, 4, 5])],
        vec![vi("Y", DataType::Float, &[5, 3, 7])],
        vec![make_tensor_i64("shape", &[3], &[5, 3, 7])],
    );
    assert_eq!(load(&m).unwrap_err().kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn test_concat_last_axis() {
    let m = model(
        single("Concat", &["A", "B"], vec![AttributeProto::int("axis", 3)]),
        vec![vi("A", DataType::Float, &[1, 2, 3, 4]), vi("B", DataType::Float, &[1, 2, 3, 5])],
        vec![vi("Y", DataType::Float, &[1, 2, 3, 9])],
        vec![],
    );
    assert_eq!(output_type(&m).dims(), &[1, 2, 3, 9]);
}

#[test]
fn test_gather_axis_one() {
    let m = model(
        single("Gather", &["X", "idx"], vec![AttributeProto::int("axis", 1)]),
        vec![vi("X", DataType::Float, &[3, 3]), vi("idx", DataType::Int64, &[1, 2])],
        vec![vi("Y", DataType::Float, &[3, 1, 2])],
        vec![],
    );
    assert_eq!(output_type(&m).dims(), &[3, 1, 2]);
}

#[test]
fn test_reduce_mean_keepdims() {
    let m = model(
        single("ReduceMean", &["X", "axes"], vec![AttributeProto::int("keepdims", 1)]),
        vec![vi("X", DataType::Float, &[3, 2, 2])],
        vec![vi("Y", DataType::Float, &[3, 1, 2])],
        vec![make_tensor_i64("axes", &[1], &[1])],
    );
    assert_eq!(output_type(&m).dims(), &[3, 1, 2]);
}

#[test]
fn test_slice_with_unsigned_bounds() {
    let m = model(
        single("Slice", &["X", "starts", "ends"], vec![]),
        vec![vi("X", DataType::Float, &[20, 10, 5])],
        vec![vi("Y", DataType::Float, &[3, 10, 5])],
        vec![u32_raw("starts", &[0, 0]), u32_raw("ends", &[3, 10])],
    );
    assert_eq!(output_type(&m).dims(), &[3, 10, 5]);
}

#[test]
fn test_pad_constant() {
    let m = model(
        single("Pad", &["X", "pads"], vec![]),
        vec![vi("X", DataType::Float, &[1, 3, 4, 4])],
        vec![vi("Y", DataType::Float, &[1, 3, 6, 6])],
        vec![make_tensor_i64("pads", &[8], &[0, 0, 1, 1, 0, 0, 1, 1])],
    );
    assert_eq!(output_type(&m).dims(), &[1, 3, 6, 6]);
}

// ── multi-node graphs ──────────────────────────────────────────────

fn linear_model() -> ModelProto {
    model(
        vec![
            make_node("MatMul", &["X", "W"], &["h"], "matmul", vec![]),
            make_node("Add", &["h", "b"], &["Y"], "bias", vec![]),
        ],
        vec![vi("X", DataType::Float, &[2, 3])],
        vec![vi("Y", DataType::Float, &[2, 4])],
        vec![
            make_tensor_f32("W", &[3, 4], &[0.5; 12]),
            make_tensor_f32("b", &[4], &[1.0; 4]),
        ],
    )
}

#[test]
fn test_linear_layer() {
    let g = load(&linear_model()).unwrap();
    assert_eq!(g.num_nodes(), 2);
    assert_eq!(g.constants().len(), 2);
    assert_eq!(g.constant_bytes(), 16 * 4);
    assert_eq!(g.tensor_type(g.outputs()[0]).unwrap().dims(), &[2, 4]);
}

#[test]
fn test_round_trip_preserves_structure() {
    let t = Translator::with_defaults();
    let first = t.import(&linear_model()).unwrap();
    let exported = t.export(&first).unwrap();
    assert_eq!(exported.graph.node[0].name, "matmul");
    assert_eq!(exported.graph.output[0].name, "Y");

    let second = t.import(&exported).unwrap();
    assert_eq!(first.op_histogram(), second.op_histogram());
    assert_eq!(
        first.tensor_type(first.outputs()[0]).unwrap(),
        second.tensor_type(second.outputs()[0]).unwrap()
    );
}

#[test]
fn test_round_trip_through_json() {
    let json = linear_model().to_json().unwrap();
    let back = ModelProto::from_json(&json).unwrap();
    assert_eq!(load(&back).unwrap().num_nodes(), 2);
}

#[test]
fn test_round_trip_through_protobuf() {
    let t = Translator::with_defaults();
    let bytes = linear_model().encode_protobuf();
    let first = t.import(&ModelProto::decode_protobuf(&bytes).unwrap()).unwrap();
    let exported = t.export(&first).unwrap().encode_protobuf();
    let second = t.import(&ModelProto::decode_protobuf(&exported).unwrap()).unwrap();
    assert_eq!(first.op_histogram(), second.op_histogram());
    assert_eq!(first.nodes()[0].op, second.nodes()[0].op);
}

#[test]
fn test_export_to_older_opset() {
    let m = model(
        single("ReduceSum", &["X", "axes"], vec![]),
        vec![vi("X", DataType::Float, &[3, 4])],
        vec![vi("Y", DataType::Float, &[1, 4])],
        vec![make_tensor_i64("axes", &[1], &[0])],
    );
    let g = load(&m).unwrap();
    let config = ExportConfig {
        opset_version: 13,
        ..Default::default()
    };
    let old = export(&g, &config).unwrap();
    assert_eq!(old.default_opset(), Some(13));
    // ReduceSum takes axes as an input from opset 13 on.
    assert_eq!(old.graph.node[0].input.len(), 2);
}

// ── operator round trips ───────────────────────────────────────────

const F32: DType = DType::F32;

/// Builds a one-node graph, exports it, imports the result and checks the
/// operator parameters and output types survived.
fn assert_round_trip(op: Operator, inputs: &[(DType, &[usize])]) {
    let mut b = ModelGraph::new("case");
    let ids: Vec<_> = inputs
        .iter()
        .enumerate()
        .map(|(i, (dtype, dims))| b.add_input(Some(format!("x{i}").as_str()), *dtype, *dims).unwrap())
        .collect();
    for id in b.add_node(op.clone(), &ids).unwrap() {
        b.mark_output(id).unwrap();
    }
    let first = b.finish().unwrap();
    let kind = op.kind();
    let m = export(&first, &ExportConfig::default())
        .unwrap_or_else(|e| panic!("{kind} failed to export: {e}"));
    let second = load(&m).unwrap_or_else(|e| panic!("{kind} failed to re-import: {e}"));

    assert_eq!(second.num_nodes(), 1, "{kind}");
    assert_eq!(second.nodes()[0].op, op, "{kind} parameters changed");
    let types = |g: &ModelGraph<Complete>| {
        g.outputs()
            .iter()
            .map(|&id| g.tensor_type(id).unwrap().clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(types(&second), types(&first), "{kind} output types changed");
}

#[test]
fn test_round_trip_nn_operators() {
    let image: &[usize] = &[1, 4, 9, 9];
    assert_round_trip(
        Operator::Conv(ConvParams {
            kernel_shape: vec![3, 3],
            pads: vec![1, 0, 2, 1],
            strides: vec![2, 1],
            dilations: vec![1, 2],
            group: 2,
            auto_pad: AutoPad::NotSet,
        }),
        &[(F32, image), (F32, &[6, 2, 3, 3]), (F32, &[6])],
    );
    assert_round_trip(
        Operator::Conv(ConvParams {
            auto_pad: AutoPad::SameLower,
            strides: vec![2, 2],
            ..Default::default()
        }),
        &[(F32, image), (F32, &[8, 4, 2, 2])],
    );
    assert_round_trip(
        Operator::Gemm(GemmParams {
            alpha: 0.5,
            beta: 2.0,
            trans_a: true,
            trans_b: true,
        }),
        &[(F32, &[3, 2]), (F32, &[4, 3]), (F32, &[4])],
    );
    assert_round_trip(Operator::MatMul, &[(F32, &[2, 3]), (F32, &[3, 5])]);
    let c: &[usize] = &[4];
    assert_round_trip(
        Operator::BatchNormalization(BatchNormParams {
            epsilon: 1e-3,
            momentum: 0.8,
        }),
        &[(F32, image), (F32, c), (F32, c), (F32, c), (F32, c)],
    );
    assert_round_trip(
        Operator::MaxPool(PoolParams {
            kernel_shape: vec![2, 2],
            pads: vec![0, 0, 1, 1],
            strides: vec![2, 2],
            dilations: vec![2, 1],
            ceil_mode: true,
            ..Default::default()
        }),
        &[(F32, image)],
    );
    assert_round_trip(
        Operator::AveragePool(PoolParams {
            kernel_shape: vec![3, 3],
            strides: vec![2, 2],
            auto_pad: AutoPad::SameUpper,
            count_include_pad: true,
            ..Default::default()
        }),
        &[(F32, image)],
    );
    assert_round_trip(Operator::GlobalAveragePool, &[(F32, image)]);
    assert_round_trip(Operator::GlobalMaxPool, &[(F32, image)]);
}

#[test]
fn test_round_trip_elementwise_operators() {
    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div, BinaryOp::Pow] {
        assert_round_trip(Operator::Binary(op), &[(F32, &[2, 3]), (F32, &[3])]);
    }
    for op in [UnaryOp::Relu, UnaryOp::Sigmoid, UnaryOp::Tanh, UnaryOp::Abs, UnaryOp::Identity] {
        assert_round_trip(Operator::Unary(op), &[(F32, &[2, 3])]);
    }
    assert_round_trip(Operator::Softmax { axis: 0 }, &[(F32, &[2, 3])]);
    assert_round_trip(
        Operator::Where,
        &[(DType::Bool, &[2, 3]), (F32, &[2, 3]), (F32, &[3])],
    );
    assert_round_trip(
        Operator::Clip(ClipParams {
            min: Some(Tensor::scalar_f32(-1.0)),
            max: Some(Tensor::scalar_f32(6.0)),
        }),
        &[(F32, &[2, 3])],
    );
    assert_round_trip(
        Operator::Clip(ClipParams {
            min: None,
            max: Some(Tensor::scalar_f32(6.0)),
        }),
        &[(F32, &[2, 3])],
    );
}

#[test]
fn test_round_trip_layout_operators() {
    let cube: &[usize] = &[2, 3, 4];
    assert_round_trip(Operator::Flatten { axis: 2 }, &[(F32, cube)]);
    assert_round_trip(Operator::Concat { axis: 1 }, &[(F32, &[2, 3]), (F32, &[2, 2])]);
    assert_round_trip(
        Operator::Reshape(ReshapeParams {
            shape: vec![0, -1],
            allowzero: false,
        }),
        &[(F32, cube)],
    );
    assert_round_trip(
        Operator::Reshape(ReshapeParams {
            shape: vec![4, -1, 3],
            allowzero: true,
        }),
        &[(F32, cube)],
    );
    assert_round_trip(
        Operator::Gather(GatherParams { axis: 1 }),
        &[(F32, &[3, 5]), (DType::I64, &[2])],
    );
    assert_round_trip(
        Operator::GatherElements(GatherParams { axis: -1 }),
        &[(F32, &[3, 5]), (DType::I64, &[3, 2])],
    );
    assert_round_trip(
        Operator::Slice(SliceParams {
            starts: vec![1, 0],
            ends: vec![3, -1],
            axes: vec![],
            steps: vec![1, 2],
        }),
        &[(F32, &[4, 6])],
    );
    assert_round_trip(
        Operator::Slice(SliceParams {
            starts: vec![0],
            ends: vec![i64::MAX],
            axes: vec![-1],
            steps: vec![],
        }),
        &[(F32, &[4, 6])],
    );
    assert_round_trip(
        Operator::Pad(PadParams {
            pads: vec![0, 1, 0, 2],
            mode: PadMode::Constant,
            constant_value: Some(Tensor::scalar_f32(0.5)),
            axes: vec![],
        }),
        &[(F32, &[2, 3])],
    );
    assert_round_trip(
        Operator::Pad(PadParams {
            pads: vec![1, 1],
            mode: PadMode::Reflect,
            constant_value: None,
            axes: vec![1],
        }),
        &[(F32, &[2, 3])],
    );
    assert_round_trip(
        Operator::Pad(PadParams {
            pads: vec![1, 0, 0, 1],
            mode: PadMode::Edge,
            ..Default::default()
        }),
        &[(F32, &[2, 3])],
    );
}

#[test]
fn test_round_trip_reductions() {
    let cube: &[usize] = &[2, 3, 4];
    let cases = [
        (ReduceOp::Mean, vec![1], false, false),
        (ReduceOp::Max, vec![], true, true),
        (ReduceOp::Min, vec![-1], true, false),
        (ReduceOp::Sum, vec![0, 2], false, false),
        (ReduceOp::Sum, vec![], false, true),
    ];
    for (op, axes, keepdims, noop_with_empty_axes) in cases {
        assert_round_trip(
            Operator::Reduce(ReduceParams {
                op,
                axes,
                keepdims,
                noop_with_empty_axes,
            }),
            &[(F32, cube)],
        );
    }
}

// ── failures ───────────────────────────────────────────────────────

#[test]
fn test_unsupported_operator() {
    let m = model(
        single("LSTM", &["X"], vec![]),
        vec![vi("X", DataType::Float, &[1, 2, 3])],
        vec![vi("Y", DataType::Float, &[1, 2, 3])],
        vec![],
    );
    let err = load(&m).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperator);
    assert!(err.to_string().contains("LSTM"));
}

#[test]
fn test_dangling_output() {
    let m = model(
        single("Relu", &["X"], vec![]),
        vec![vi("X", DataType::Float, &[4])],
        vec![vi("Z", DataType::Float, &[4])],
        vec![],
    );
    let err = load(&m).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DanglingOutput);
    assert!(err.to_string().contains('Z'));
}

#[test]
fn test_cycle_is_reported_as_out_of_order() {
    let m = model(
        vec![
            make_node("Relu", &["b"], &["a"], "first", vec![]),
            make_node("Relu", &["a"], &["b"], "second", vec![]),
        ],
        vec![],
        vec![vi("b", DataType::Float, &[4])],
        vec![],
    );
    assert_eq!(load(&m).unwrap_err().kind(), ErrorKind::OutOfOrderReference);
}

#[test]
fn test_cyclic_dependencies() {
    let err = model_ir::topological_order(&[vec![1], vec![0]]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicGraph);
}

#[test]
fn test_foreign_opset_only() {
    // No default-domain opset: the configured default applies.
    let mut m = linear_model();
    m.opset_import = vec![make_opsetid("com.example", 1)];
    let config = BridgeConfig::default();
    let t = Translator::new(config, &NullRuntime).unwrap();
    assert_eq!(t.import(&m).unwrap().num_nodes(), 2);
}

// ── frontend ───────────────────────────────────────────────────────

#[test]
fn test_frontend_chained_adds() {
    let mut h = GraphHandler::new("chain", &NullRuntime, ExportConfig::default());
    let t: Vec<_> = (0..9).map(|_| h.tensor(&[1, 2, 3], 12).unwrap()).collect();
    h.add(t[0], t[1], Some(t[2])).unwrap();
    h.add(t[2], t[3], Some(t[4])).unwrap();
    h.add(t[4], t[5], Some(t[6])).unwrap();
    h.add(t[6], t[7], Some(t[8])).unwrap();

    let m = h.materialize().unwrap();
    assert_eq!(m.graph.node.len(), 4);
    assert!(m.graph.node.iter().all(|n| n.op_type == "Add"));
    assert_eq!(m.graph.input.len(), 5);
    assert_eq!(m.graph.output.len(), 1);
    assert_eq!(m.graph.output[0].elem_type, DataType::Uint32.code());

    let g = load(&m).unwrap();
    assert_eq!(g.op_histogram().get(&OpKind::Add), Some(&4));
}
