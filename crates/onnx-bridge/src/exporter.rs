// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph IR to model tree.
//!
//! Nodes are emitted in topological order (ties keep insertion order).
//! Explicit names are kept; everything anonymous gets a generated name:
//!
//! | Item | Name |
//! |---|---|
//! | node | `{op_type}_{n}` (position in emission order) |
//! | node output | `{node}_output_{slot}` |
//! | graph input | `input_{n}` |
//! | constant | `const_{n}` |
//! | folded operand | `{node}_{role}` (e.g. `Reshape_0_shape`) |

use crate::codec::{self, EncodedInput};
use crate::config::{ExportConfig, SUPPORTED_OPSETS};
use crate::naming::NameAllocator;
use crate::payload::tensor_to_proto;
use crate::types::data_type_of;
use crate::TranslateError;
use model_ir::{Complete, ModelGraph, TensorId, TensorOrigin, TensorType};
use onnx_proto::{
    Dimension, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, ValueInfoProto,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Exports a finished graph as a model tree targeting `config.opset_version`.
pub fn export(graph: &ModelGraph<Complete>, config: &ExportConfig) -> Result<ModelProto, TranslateError> {
    let opset = config.opset_version;
    if !SUPPORTED_OPSETS.contains(&opset) {
        return Err(TranslateError::Config(format!(
            "cannot export to opset {opset}, supported range is {}..={}",
            SUPPORTED_OPSETS.start(),
            SUPPORTED_OPSETS.end()
        )));
    }
    let order = graph.topological_order()?;

    let mut names = NameAllocator::new();
    for t in graph.tensors() {
        if let Some(name) = &t.name {
            names.reserve(name);
        }
    }
    for n in graph.nodes() {
        if let Some(name) = &n.name {
            names.reserve(name);
        }
    }

    let mut node_names = vec![String::new(); graph.num_nodes()];
    for (position, id) in order.iter().enumerate() {
        let node = &graph.nodes()[id.index()];
        node_names[id.index()] = match &node.name {
            Some(name) => name.clone(),
            None => names.fresh(&format!("{}_{position}", node.kind())),
        };
    }

    let mut tensor_names = Vec::with_capacity(graph.tensors().len());
    let (mut inputs_seen, mut constants_seen) = (0usize, 0usize);
    for t in graph.tensors() {
        let name = match (&t.name, t.origin) {
            (Some(name), _) => name.clone(),
            (None, TensorOrigin::Input) => {
                inputs_seen += 1;
                names.fresh(&format!("input_{}", inputs_seen - 1))
            }
            (None, TensorOrigin::Constant) => {
                constants_seen += 1;
                names.fresh(&format!("const_{}", constants_seen - 1))
            }
            (None, TensorOrigin::Node { node, slot }) => {
                names.fresh(&format!("{}_output_{slot}", node_names[node.index()]))
            }
        };
        tensor_names.push(name);
    }
    let name_of = |id: TensorId| tensor_names[id.index()].clone();

    let mut initializer = Vec::new();
    for &id in graph.constants() {
        if let Some(data) = &graph.tensor(id)?.data {
            initializer.push(tensor_to_proto(&tensor_names[id.index()], data));
        }
    }

    let mut nodes = Vec::with_capacity(order.len());
    for id in &order {
        let node = &graph.nodes()[id.index()];
        let node_name = &node_names[id.index()];
        let encoded = codec::encode(&node.op, node.inputs.len(), opset, node_name)?;
        let mut input = Vec::with_capacity(encoded.inputs.len());
        for operand in encoded.inputs {
            match operand {
                EncodedInput::Data(i) => input.push(name_of(node.inputs[i])),
                EncodedInput::Constant { role, tensor } => {
                    let name = names.fresh(&format!("{node_name}_{role}"));
                    initializer.push(tensor_to_proto(&name, &tensor));
                    input.push(name);
                }
                EncodedInput::Absent => input.push(String::new()),
            }
        }
        debug!(node = %node_name, op = %node.kind(), "exported node");
        nodes.push(NodeProto {
            name: node_name.clone(),
            op_type: node.kind().as_str().to_string(),
            domain: String::new(),
            input,
            output: node.outputs.iter().map(|&o| name_of(o)).collect(),
            attribute: encoded.attributes,
        });
    }

    let value_info_of = |id: TensorId| -> Result<ValueInfoProto, TranslateError> {
        Ok(value_info(&tensor_names[id.index()], graph.tensor_type(id)?))
    };
    let input = graph
        .inputs()
        .iter()
        .map(|&id| value_info_of(id))
        .collect::<Result<Vec<_>, _>>()?;
    let output = graph
        .outputs()
        .iter()
        .map(|&id| value_info_of(id))
        .collect::<Result<Vec<_>, _>>()?;
    let mut intermediate = Vec::new();
    if config.emit_intermediate_value_info {
        let outputs: HashSet<TensorId> = graph.outputs().iter().copied().collect();
        for id in &order {
            for &t in &graph.nodes()[id.index()].outputs {
                if !outputs.contains(&t) {
                    intermediate.push(value_info_of(t)?);
                }
            }
        }
    }

    let model = ModelProto {
        ir_version: config.ir_version,
        producer_name: config.producer_name.clone(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: opset,
        }],
        graph: GraphProto {
            name: graph.name().to_string(),
            node: nodes,
            initializer,
            input,
            output,
            value_info: intermediate,
        },
    };
    info!(
        graph = graph.name(),
        opset,
        nodes = model.graph.node.len(),
        initializers = model.graph.initializer.len(),
        "exported model"
    );
    Ok(model)
}

fn value_info(name: &str, ty: &TensorType) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        elem_type: data_type_of(ty.dtype),
        shape: Some(ty.dims().iter().map(|&d| Dimension::Value(d as i64)).collect()),
    }
}
