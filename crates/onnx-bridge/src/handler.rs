// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Frontend graph construction.
//!
//! [`GraphHandler`] is what a model-building frontend talks to: declare
//! tensors by shape and element code, apply operators, then materialize
//! the result as a model tree or hand it to the runtime.
//!
//! A declared tensor is either consumed as a graph input or handed to
//! [`GraphHandler::operator_into`] as a pre-declared output, in which case
//! it is bound to the node's result. Shapes are inferred with the same
//! rules the importer uses.
//!
//! ```
//! use onnx_bridge::{GraphHandler, NullRuntime};
//! use onnx_bridge::config::ExportConfig;
//!
//! let mut h = GraphHandler::new("add", &NullRuntime, ExportConfig::default());
//! let a = h.tensor(&[1, 2, 3], 12).unwrap();
//! let b = h.tensor(&[1, 2, 3], 12).unwrap();
//! let c = h.add(a, b, None).unwrap();
//! h.mark_output(c).unwrap();
//! let model = h.materialize().unwrap();
//! assert_eq!(model.graph.node[0].op_type, "Add");
//! ```

use crate::config::ExportConfig;
use crate::exporter::export;
use crate::runtime::Runtime;
use crate::types::element_type_of;
use crate::TranslateError;
use model_ir::ops::{BinaryOp, UnaryOp};
use model_ir::{Building, Complete, ModelGraph, Operator, TensorId, TensorType};
use onnx_proto::ModelProto;
use tensor_core::{Shape, Tensor};
use tracing::debug;

/// A tensor handle issued by a [`GraphHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug, Clone)]
enum Slot {
    /// Declared but not yet an input or a node output.
    Declared(TensorType),
    Bound(TensorId),
}

/// Builds one graph through operator calls.
pub struct GraphHandler<'r> {
    graph: ModelGraph<Building>,
    slots: Vec<Slot>,
    runtime: &'r dyn Runtime,
    export: ExportConfig,
}

impl<'r> GraphHandler<'r> {
    pub fn new(name: &str, runtime: &'r dyn Runtime, export: ExportConfig) -> Self {
        Self {
            graph: ModelGraph::new(name),
            slots: Vec::new(),
            runtime,
            export,
        }
    }

    /// Declares a tensor of shape `dims` and interchange element code `data_type`.
    pub fn tensor(&mut self, dims: &[usize], data_type: i32) -> Result<Handle, TranslateError> {
        let dtype = element_type_of(data_type)?;
        self.slots
            .push(Slot::Declared(TensorType::new(dtype, Shape::from(dims))));
        Ok(Handle(self.slots.len() - 1))
    }

    /// Embeds a constant.
    pub fn constant(&mut self, name: Option<&str>, data: Tensor) -> Result<Handle, TranslateError> {
        let id = self.graph.add_constant(name, data)?;
        self.slots.push(Slot::Bound(id));
        Ok(Handle(self.slots.len() - 1))
    }

    /// Returns the type of a handle.
    pub fn tensor_type(&self, h: Handle) -> Result<TensorType, TranslateError> {
        match self.slot(h)? {
            Slot::Declared(ty) => Ok(ty.clone()),
            Slot::Bound(id) => Ok(self.graph.tensor_type(*id)?.clone()),
        }
    }

    fn slot(&self, h: Handle) -> Result<&Slot, TranslateError> {
        self.slots
            .get(h.0)
            .ok_or(TranslateError::Graph(model_ir::GraphError::UnknownTensor(h.0)))
    }

    /// Applies `op` to `inputs`, returning fresh output handles.
    pub fn operator(&mut self, op: Operator, inputs: &[Handle]) -> Result<Vec<Handle>, TranslateError> {
        self.operator_into(op, inputs, &[])
    }

    /// Applies `op` to `inputs`, binding the results to the declared
    /// tensors in `outputs` (or to fresh handles if `outputs` is empty).
    ///
    /// Nothing changes unless the whole call succeeds.
    pub fn operator_into(
        &mut self,
        op: Operator,
        inputs: &[Handle],
        outputs: &[Handle],
    ) -> Result<Vec<Handle>, TranslateError> {
        let label = op.kind().as_str();
        let types = inputs
            .iter()
            .map(|&h| self.tensor_type(h))
            .collect::<Result<Vec<_>, _>>()?;
        let inferred = op.infer(&types).map_err(|source| model_ir::GraphError::InvalidNode {
            node: label.to_string(),
            source,
        })?;
        if let Some(first) = types.first() {
            if !self.runtime.supports(op.kind(), first.dtype) {
                return Err(TranslateError::UnsupportedOperator {
                    node: label.to_string(),
                    op_type: label.to_string(),
                    detail: format!(
                        "runtime '{}' cannot execute it on {}",
                        self.runtime.name(),
                        first.dtype
                    ),
                });
            }
        }
        if !outputs.is_empty() {
            if outputs.len() != inferred.len() {
                return Err(TranslateError::Arity {
                    node: label.to_string(),
                    detail: format!(
                        "{label} produces {} output(s), {} handle(s) given",
                        inferred.len(),
                        outputs.len()
                    ),
                });
            }
            for (i, (&h, ty)) in outputs.iter().zip(&inferred).enumerate() {
                match self.slot(h)? {
                    Slot::Bound(_) => {
                        return Err(TranslateError::DuplicateName {
                            name: format!("handle #{} (already produced)", h.0),
                        })
                    }
                    Slot::Declared(declared) => check_declared(h, declared, ty)?,
                }
                if outputs[..i].contains(&h) || inputs.contains(&h) {
                    return Err(TranslateError::DuplicateName {
                        name: format!("handle #{}", h.0),
                    });
                }
            }
        }

        let mut ids = Vec::with_capacity(inputs.len());
        for &h in inputs {
            ids.push(self.bind_input(h)?);
        }
        let produced = self.graph.add_node(op, &ids)?;
        debug!(op = label, outputs = produced.len(), "handler node");

        let handles = if outputs.is_empty() {
            produced
                .into_iter()
                .map(|id| {
                    self.slots.push(Slot::Bound(id));
                    Handle(self.slots.len() - 1)
                })
                .collect()
        } else {
            for (&h, id) in outputs.iter().zip(produced) {
                self.slots[h.0] = Slot::Bound(id);
            }
            outputs.to_vec()
        };
        Ok(handles)
    }

    /// Turns a declared handle into a graph input on first use.
    fn bind_input(&mut self, h: Handle) -> Result<TensorId, TranslateError> {
        match self.slot(h)?.clone() {
            Slot::Bound(id) => Ok(id),
            Slot::Declared(ty) => {
                let id = self.graph.add_input(None, ty.dtype, ty.shape)?;
                self.slots[h.0] = Slot::Bound(id);
                Ok(id)
            }
        }
    }

    fn single(&mut self, op: Operator, inputs: &[Handle], out: Option<Handle>) -> Result<Handle, TranslateError> {
        let outputs: Vec<Handle> = out.into_iter().collect();
        let produced = self.operator_into(op, inputs, &outputs)?;
        produced.first().copied().ok_or_else(|| TranslateError::Arity {
            node: "handler".to_string(),
            detail: "operator produced no output".to_string(),
        })
    }

    pub fn add(&mut self, a: Handle, b: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::Binary(BinaryOp::Add), &[a, b], out)
    }

    pub fn sub(&mut self, a: Handle, b: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::Binary(BinaryOp::Sub), &[a, b], out)
    }

    pub fn mul(&mut self, a: Handle, b: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::Binary(BinaryOp::Mul), &[a, b], out)
    }

    pub fn div(&mut self, a: Handle, b: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::Binary(BinaryOp::Div), &[a, b], out)
    }

    pub fn matmul(&mut self, a: Handle, b: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::MatMul, &[a, b], out)
    }

    pub fn relu(&mut self, x: Handle, out: Option<Handle>) -> Result<Handle, TranslateError> {
        self.single(Operator::Unary(UnaryOp::Relu), &[x], out)
    }

    /// Declares `h` as a graph output.
    pub fn mark_output(&mut self, h: Handle) -> Result<(), TranslateError> {
        let id = self.bind_input(h)?;
        self.graph.mark_output(id)?;
        Ok(())
    }

    /// Finishes a copy of the graph. When no output was marked, every node
    /// output nothing consumes becomes one.
    pub fn finished(&self) -> Result<ModelGraph<Complete>, TranslateError> {
        let mut graph = self.graph.clone();
        if graph.outputs().is_empty() {
            let sinks: Vec<TensorId> = graph
                .nodes()
                .iter()
                .flat_map(|n| n.outputs.iter().copied())
                .filter(|&id| !graph.is_consumed(id))
                .collect();
            for id in sinks {
                graph.mark_output(id)?;
            }
        }
        Ok(graph.finish()?)
    }

    /// Serializes the graph built so far.
    pub fn materialize(&self) -> Result<ModelProto, TranslateError> {
        export(&self.finished()?, &self.export)
    }

    /// Hands the graph built so far to the runtime.
    pub fn run(&self) -> Result<(), TranslateError> {
        let graph = self.finished()?;
        self.runtime.execute(&graph)
    }
}

fn check_declared(h: Handle, declared: &TensorType, inferred: &TensorType) -> Result<(), TranslateError> {
    if declared.dtype != inferred.dtype {
        return Err(TranslateError::DeclaredTypeMismatch {
            tensor: format!("handle #{}", h.0),
            declared: crate::types::data_type_of(declared.dtype),
            inferred: inferred.dtype,
        });
    }
    if declared.shape != inferred.shape {
        return Err(TranslateError::DeclaredShapeMismatch {
            tensor: format!("handle #{}", h.0),
            declared: declared.shape.to_string(),
            inferred: inferred.shape.clone(),
        });
    }
    Ok(())
}
