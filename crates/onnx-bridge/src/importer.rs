// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model tree to graph IR.
//!
//! # Import steps
//! 1. Initializers (and `Constant` nodes, as they are reached) become
//!    *pending* constants. A pending constant enters the graph only when a
//!    node consumes it as runtime data or it is a graph output; constants
//!    that only feed folded operands (reshape targets, slice bounds, ...)
//!    end up inside parameter records.
//! 2. Graph inputs not shadowed by an initializer become graph inputs.
//! 3. Nodes are processed in declaration order. Every input must already
//!    be defined.
//! 4. Graph outputs are resolved, and declared types are checked against
//!    the inferred ones.

use crate::codec::{self, DecodeContext, OperandSource};
use crate::config::ImportConfig;
use crate::naming::NameAllocator;
use crate::payload::tensor_from_proto;
use crate::runtime::Runtime;
use crate::types::{data_type_of, element_type_named};
use crate::TranslateError;
use model_ir::{Building, Complete, ModelGraph, OpKind, TensorId, TensorType};
use onnx_proto::{
    is_default_domain, AttributeValue, Dimension, ModelProto, NodeProto, ValueInfoProto,
};
use std::collections::{HashMap, HashSet};
use tensor_core::{Shape, Tensor};
use tracing::{debug, info, warn};

/// Imports `model` into a finished graph.
///
/// The model is never modified. On error no graph is produced.
pub fn import(
    model: &ModelProto,
    config: &ImportConfig,
    runtime: &dyn Runtime,
) -> Result<ModelGraph<Complete>, TranslateError> {
    let opset = model.default_opset().unwrap_or_else(|| {
        warn!(
            default = config.default_opset,
            "model imports no default-domain opset, assuming the configured default"
        );
        config.default_opset
    });
    let source = &model.graph;
    let name = if source.name.is_empty() { "main" } else { source.name.as_str() };
    let mut state = ImportState::new(name);

    for init in &source.initializer {
        if init.name.is_empty() {
            return Err(TranslateError::InvalidPayload {
                tensor: String::new(),
                detail: "initializer has no name".to_string(),
            });
        }
        state.add_pending(&init.name, tensor_from_proto(init)?)?;
    }

    for input in &source.input {
        if state.pending.contains_key(&input.name) {
            debug!(input = %input.name, "graph input shadowed by an initializer");
            continue;
        }
        state.add_input(input, config)?;
    }

    let later: HashSet<&str> = source
        .node
        .iter()
        .flat_map(|n| n.output.iter().map(String::as_str))
        .filter(|s| !s.is_empty())
        .collect();

    for (index, node) in source.node.iter().enumerate() {
        let label = if node.name.is_empty() {
            format!("{}_{index}", node.op_type)
        } else {
            node.name.clone()
        };
        if node.op_type == "Constant" && is_default_domain(&node.domain) {
            state.add_constant_node(node, &label)?;
            continue;
        }
        state.add_node(node, &label, opset, runtime, &later)?;
    }

    for output in &source.output {
        let id = state
            .resolve(&output.name)?
            .ok_or_else(|| TranslateError::DanglingOutput {
                name: output.name.clone(),
            })?;
        state.graph.mark_output(id)?;
        if config.verify_declared_shapes {
            state.verify_declared(output)?;
        }
    }

    if config.verify_declared_shapes {
        for info in &source.value_info {
            if state.types.contains_key(&info.name) {
                state.verify_declared(info)?;
            } else {
                debug!(value = %info.name, "value_info for an unknown value ignored");
            }
        }
    }

    let graph = state.graph.finish()?;
    info!(opset, "{}", graph.summary());
    Ok(graph)
}

struct ImportState {
    graph: ModelGraph<Building>,
    /// Constants not yet materialized in the graph.
    pending: HashMap<String, Tensor>,
    /// Type of every defined name, pending constants included.
    types: HashMap<String, TensorType>,
    /// Names already present in the graph.
    ids: HashMap<String, TensorId>,
    node_names: NameAllocator,
}

impl OperandSource for ImportState {
    fn constant(&self, name: &str) -> Option<&Tensor> {
        if let Some(t) = self.pending.get(name) {
            return Some(t);
        }
        let id = self.ids.get(name)?;
        self.graph.tensor(*id).ok()?.data.as_ref()
    }

    fn value_type(&self, name: &str) -> Option<&TensorType> {
        self.types.get(name)
    }
}

impl ImportState {
    fn new(name: &str) -> Self {
        Self {
            graph: ModelGraph::new(name),
            pending: HashMap::new(),
            types: HashMap::new(),
            ids: HashMap::new(),
            node_names: NameAllocator::new(),
        }
    }

    fn claim(&self, name: &str) -> Result<(), TranslateError> {
        if self.types.contains_key(name) {
            return Err(TranslateError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn add_pending(&mut self, name: &str, tensor: Tensor) -> Result<(), TranslateError> {
        self.claim(name)?;
        self.types.insert(
            name.to_string(),
            TensorType::new(tensor.dtype(), tensor.shape().clone()),
        );
        self.pending.insert(name.to_string(), tensor);
        Ok(())
    }

    fn add_input(&mut self, info: &ValueInfoProto, config: &ImportConfig) -> Result<(), TranslateError> {
        self.claim(&info.name)?;
        let dtype = element_type_named(info.elem_type, &info.name)?;
        let unresolved = |detail: String| TranslateError::UnresolvedShape {
            tensor: info.name.clone(),
            detail,
        };
        let dims = info
            .shape
            .as_ref()
            .ok_or_else(|| unresolved("no shape declared".to_string()))?;
        let dims = dims
            .iter()
            .map(|d| match d {
                Dimension::Value(v) if *v >= 0 => Ok(*v as usize),
                Dimension::Value(v) => Err(unresolved(format!("dimension {v} is not concrete"))),
                Dimension::Param(p) => config
                    .symbolic_dims
                    .get(p)
                    .copied()
                    .ok_or_else(|| unresolved(format!("symbolic dimension '{p}' has no binding"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = self.graph.add_input(Some(&info.name), dtype, Shape::new(dims))?;
        let ty = self.graph.tensor_type(id)?.clone();
        debug!(input = %info.name, %ty, "graph input");
        self.types.insert(info.name.clone(), ty);
        self.ids.insert(info.name.clone(), id);
        Ok(())
    }

    /// Registers the value of a `Constant` node as a pending constant.
    fn add_constant_node(&mut self, node: &NodeProto, label: &str) -> Result<(), TranslateError> {
        let Some(output) = node.output.first().filter(|s| !s.is_empty()) else {
            return Err(TranslateError::Arity {
                node: label.to_string(),
                detail: "Constant produces 1 output, 0 listed".to_string(),
            });
        };
        let [attr] = node.attribute.as_slice() else {
            return Err(TranslateError::unsupported_value(
                label,
                "value",
                format!("Constant needs exactly one value attribute, got {}", node.attribute.len()),
            ));
        };
        let tensor = match (attr.name.as_str(), &attr.value) {
            ("value", AttributeValue::Tensor(t)) => {
                let mut t = t.clone();
                t.name = output.clone();
                tensor_from_proto(&t)?
            }
            ("value_float", AttributeValue::Float(v)) => Tensor::scalar_f32(*v),
            ("value_floats", AttributeValue::Floats(v)) => Tensor::from_f32(Shape::vector(v.len()), v)
                .map_err(|e| TranslateError::InvalidPayload {
                    tensor: output.clone(),
                    detail: e.to_string(),
                })?,
            ("value_int", AttributeValue::Int(v)) => Tensor::from_i64(Shape::scalar(), &[*v])
                .map_err(|e| TranslateError::InvalidPayload {
                    tensor: output.clone(),
                    detail: e.to_string(),
                })?,
            ("value_ints", AttributeValue::Ints(v)) => Tensor::vector_i64(v),
            (name, value) => {
                return Err(TranslateError::unsupported_value(
                    label,
                    name,
                    format!("unsupported Constant payload of type {}", value.type_name()),
                ))
            }
        };
        debug!(node = label, output = %output, "constant node");
        self.add_pending(output, tensor)
    }

    /// Returns the graph handle for `name`, materializing a pending constant.
    fn resolve(&mut self, name: &str) -> Result<Option<TensorId>, TranslateError> {
        if let Some(id) = self.ids.get(name) {
            return Ok(Some(*id));
        }
        let Some(tensor) = self.pending.remove(name) else {
            return Ok(None);
        };
        let id = self.graph.add_constant(Some(name), tensor)?;
        self.ids.insert(name.to_string(), id);
        Ok(Some(id))
    }

    fn add_node(
        &mut self,
        node: &NodeProto,
        label: &str,
        opset: i64,
        runtime: &dyn Runtime,
        later: &HashSet<&str>,
    ) -> Result<(), TranslateError> {
        let unsupported = |detail: String| TranslateError::UnsupportedOperator {
            node: label.to_string(),
            op_type: node.op_type.clone(),
            detail,
        };
        if !is_default_domain(&node.domain) {
            return Err(unsupported(format!("domain '{}' is not supported", node.domain)));
        }
        let kind = OpKind::from_name(&node.op_type)
            .ok_or_else(|| unsupported("not in the operator catalog".to_string()))?;

        for input in node.input.iter().filter(|s| !s.is_empty()) {
            if !self.types.contains_key(input) {
                return Err(TranslateError::OutOfOrderReference {
                    node: label.to_string(),
                    tensor: input.clone(),
                    detail: if later.contains(input.as_str()) {
                        "is produced by a later node"
                    } else {
                        "is never defined"
                    },
                });
            }
        }

        let decoded = codec::decode(
            kind,
            &DecodeContext {
                node,
                label,
                opset,
                src: &*self,
            },
        )?;

        if let Some(first) = decoded.inputs.first().and_then(|n| self.types.get(n)) {
            if !runtime.supports(kind, first.dtype) {
                return Err(unsupported(format!(
                    "runtime '{}' cannot execute it on {}",
                    runtime.name(),
                    first.dtype
                )));
            }
        }

        let outputs: Vec<&str> = node
            .output
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        for out in &outputs {
            self.claim(out)?;
        }

        let mut inputs = Vec::with_capacity(decoded.inputs.len());
        for name in &decoded.inputs {
            let id = self
                .resolve(name)?
                .ok_or_else(|| TranslateError::OutOfOrderReference {
                    node: label.to_string(),
                    tensor: name.clone(),
                    detail: "is never defined",
                })?;
            inputs.push(id);
        }

        let node_name = if node.name.is_empty() {
            None
        } else if self.node_names.reserve(&node.name) {
            Some(node.name.clone())
        } else {
            let renamed = self.node_names.fresh(&node.name);
            warn!(node = %node.name, renamed = %renamed, "duplicate node name");
            Some(renamed)
        };

        let ids = self
            .graph
            .add_named_node(node_name.as_deref(), decoded.op, &inputs, &outputs)?;
        for (name, id) in outputs.iter().zip(&ids) {
            let ty = self.graph.tensor_type(*id)?.clone();
            debug!(node = label, op = %kind, output = %name, %ty, "imported node");
            self.types.insert(name.to_string(), ty);
            self.ids.insert(name.to_string(), *id);
        }
        Ok(())
    }

    /// Checks a declared element type and shape against what was inferred.
    fn verify_declared(&self, info: &ValueInfoProto) -> Result<(), TranslateError> {
        let Some(ty) = self.types.get(&info.name) else {
            return Ok(());
        };
        if info.elem_type != 0 && info.elem_type != data_type_of(ty.dtype) {
            return Err(TranslateError::DeclaredTypeMismatch {
                tensor: info.name.clone(),
                declared: info.elem_type,
                inferred: ty.dtype,
            });
        }
        let Some(declared) = &info.shape else {
            return Ok(());
        };
        let agrees = declared.len() == ty.rank()
            && declared.iter().zip(ty.dims()).all(|(d, &actual)| match d {
                Dimension::Value(v) => *v < 0 || *v as usize == actual,
                Dimension::Param(_) => true,
            });
        if !agrees {
            return Err(TranslateError::DeclaredShapeMismatch {
                tensor: info.name.clone(),
                declared: format_dims(declared),
                inferred: ty.shape.clone(),
            });
        }
        Ok(())
    }
}

fn format_dims(dims: &[Dimension]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|d| match d {
            Dimension::Value(v) => v.to_string(),
            Dimension::Param(p) => p.clone(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
