// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tree constructors in the style of the format's reference helper module.
//!
//! ```
//! use onnx_proto::helper::*;
//! use onnx_proto::DataType;
//!
//! let x = make_tensor_value_info("x", DataType::Float, &[1, 3, 5, 7]);
//! let y = make_tensor_value_info("y", DataType::Float, &[1, 3, 5, 7]);
//! let relu = make_node("Relu", &["x"], &["y"], "relu", vec![]);
//! let model = make_model(make_graph(vec![relu], "relu", vec![x], vec![y], vec![]));
//! assert_eq!(model.default_opset(), Some(DEFAULT_OPSET));
//! ```

use crate::{
    DataType, Dimension, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    ValueInfoProto,
};

pub use crate::AttributeProto;

/// Operator-set version stamped by [`make_model`].
pub const DEFAULT_OPSET: i64 = 18;

/// IR version stamped by [`make_model`].
pub const DEFAULT_IR_VERSION: i64 = 8;

/// Builds a node in the default domain.
pub fn make_node(
    op_type: &str,
    inputs: &[&str],
    outputs: &[&str],
    name: &str,
    attributes: Vec<AttributeProto>,
) -> NodeProto {
    NodeProto {
        name: name.to_string(),
        op_type: op_type.to_string(),
        domain: String::new(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        attribute: attributes,
    }
}

/// Describes a value with a fully concrete shape.
pub fn make_tensor_value_info(name: &str, elem_type: DataType, dims: &[i64]) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        elem_type: elem_type.code(),
        shape: Some(dims.iter().map(|&d| Dimension::Value(d)).collect()),
    }
}

/// Describes a value whose shape may contain symbolic dims.
pub fn make_symbolic_value_info(
    name: &str,
    elem_type: DataType,
    dims: Vec<Dimension>,
) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        elem_type: elem_type.code(),
        shape: Some(dims),
    }
}

/// Assembles a graph.
pub fn make_graph(
    nodes: Vec<NodeProto>,
    name: &str,
    inputs: Vec<ValueInfoProto>,
    outputs: Vec<ValueInfoProto>,
    initializers: Vec<TensorProto>,
) -> GraphProto {
    GraphProto {
        name: name.to_string(),
        node: nodes,
        initializer: initializers,
        input: inputs,
        output: outputs,
        value_info: Vec::new(),
    }
}

/// Wraps a graph in a model importing the default operator set.
pub fn make_model(graph: GraphProto) -> ModelProto {
    ModelProto {
        ir_version: DEFAULT_IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        opset_import: vec![make_opsetid("", DEFAULT_OPSET)],
        graph,
    }
}

pub fn make_opsetid(domain: &str, version: i64) -> OperatorSetIdProto {
    OperatorSetIdProto {
        domain: domain.to_string(),
        version,
    }
}

/// An `INT64` tensor in the typed field.
pub fn make_tensor_i64(name: &str, dims: &[i64], values: &[i64]) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        data_type: DataType::Int64.code(),
        dims: dims.to_vec(),
        int64_data: values.to_vec(),
        ..Default::default()
    }
}

/// A `FLOAT` tensor in the typed field.
pub fn make_tensor_f32(name: &str, dims: &[i64], values: &[f32]) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        data_type: DataType::Float.code(),
        dims: dims.to_vec(),
        float_data: values.to_vec(),
        ..Default::default()
    }
}

/// A tensor of any type from packed little-endian bytes.
pub fn make_tensor_raw(name: &str, data_type: DataType, dims: &[i64], raw: Vec<u8>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        data_type: data_type.code(),
        dims: dims.to_vec(),
        raw_data: raw,
        ..Default::default()
    }
}
