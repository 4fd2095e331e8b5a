// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: tensors and operator nodes owned by one arena.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Building>: tensors and nodes are being added.
//!       │  .finish()
//!       ▼
//! ModelGraph<Complete>: outputs declared, every shape resolved.
//! ```
//!
//! Exporters and runtimes only accept `ModelGraph<Complete>`, so they never
//! see a graph that is still being assembled. The marker types are
//! `PhantomData` (ZST).
//!
//! Every node is type-checked as it is inserted, and a node may only consume
//! tensors that already exist. Insertion order is therefore always a valid
//! execution order.

use crate::ops::{OpKind, Operator, TensorType};
use crate::{GraphError, OpError};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::fmt;
use tensor_core::{DType, Shape, Tensor};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph is still being assembled.
#[derive(Debug, Clone)]
pub struct Building;

/// Marker: graph is finished and ready for export or execution.
#[derive(Debug, Clone)]
pub struct Complete;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone + private::Sealed {}
impl GraphState for Building {}
impl GraphState for Complete {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Building {}
    impl Sealed for super::Complete {}
}

// ── Handles and records ────────────────────────────────────────────

/// Handle to a tensor owned by a [`ModelGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);

impl TensorId {
    /// Position of the tensor in [`ModelGraph::tensors`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a node owned by a [`ModelGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in [`ModelGraph::nodes`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a tensor's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorOrigin {
    /// Supplied by the caller at execution time.
    Input,
    /// Embedded in the graph.
    Constant,
    /// Output `slot` of a node.
    Node { node: NodeId, slot: usize },
}

/// A tensor descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDef {
    pub name: Option<String>,
    pub ty: TensorType,
    pub origin: TensorOrigin,
    /// Payload, present exactly for [`TensorOrigin::Constant`].
    pub data: Option<Tensor>,
}

impl TensorDef {
    pub fn dtype(&self) -> DType {
        self.ty.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.ty.shape
    }

    /// Returns the producing node, if any.
    pub fn producer(&self) -> Option<NodeId> {
        match self.origin {
            TensorOrigin::Node { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// An operator node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub name: Option<String>,
    pub op: Operator,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
}

impl NodeDef {
    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }
}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A computation graph over typed tensors.
///
/// The graph owns every tensor and node; callers hold [`TensorId`] and
/// [`NodeId`] handles. Tensors and nodes never change after insertion.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Building> {
    name: String,
    tensors: Vec<TensorDef>,
    nodes: Vec<NodeDef>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,
    constants: Vec<TensorId>,
    tensor_names: HashMap<String, TensorId>,
    node_names: HashSet<String>,
    _state: std::marker::PhantomData<S>,
}

// ── Building state ─────────────────────────────────────────────────

impl ModelGraph<Building> {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tensors: Vec::new(),
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            constants: Vec::new(),
            tensor_names: HashMap::new(),
            node_names: HashSet::new(),
            _state: std::marker::PhantomData,
        }
    }

    fn check_tensor_name(&self, name: Option<&str>) -> Result<(), GraphError> {
        match name {
            Some(n) if self.tensor_names.contains_key(n) => Err(GraphError::DuplicateName {
                name: n.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn push_tensor(&mut self, def: TensorDef) -> TensorId {
        let id = TensorId(self.tensors.len());
        if let Some(name) = &def.name {
            self.tensor_names.insert(name.clone(), id);
        }
        self.tensors.push(def);
        id
    }

    /// Declares a runtime input.
    pub fn add_input(
        &mut self,
        name: Option<&str>,
        dtype: DType,
        shape: impl Into<Shape>,
    ) -> Result<TensorId, GraphError> {
        self.check_tensor_name(name)?;
        let id = self.push_tensor(TensorDef {
            name: name.map(str::to_string),
            ty: TensorType::new(dtype, shape),
            origin: TensorOrigin::Input,
            data: None,
        });
        self.inputs.push(id);
        Ok(id)
    }

    /// Embeds a constant tensor.
    pub fn add_constant(&mut self, name: Option<&str>, data: Tensor) -> Result<TensorId, GraphError> {
        self.check_tensor_name(name)?;
        let id = self.push_tensor(TensorDef {
            name: name.map(str::to_string),
            ty: TensorType::new(data.dtype(), data.shape().clone()),
            origin: TensorOrigin::Constant,
            data: Some(data),
        });
        self.constants.push(id);
        Ok(id)
    }

    /// Appends an anonymous node and returns its output handles.
    pub fn add_node(&mut self, op: Operator, inputs: &[TensorId]) -> Result<Vec<TensorId>, GraphError> {
        self.add_named_node(None, op, inputs, &[])
    }

    /// Appends a node, naming it and (optionally) its outputs.
    ///
    /// `outputs` is either empty (anonymous outputs) or one name per output
    /// the operator produces. The node is fully validated before anything
    /// is inserted, so a failed call leaves the graph unchanged.
    pub fn add_named_node(
        &mut self,
        name: Option<&str>,
        op: Operator,
        inputs: &[TensorId],
        outputs: &[&str],
    ) -> Result<Vec<TensorId>, GraphError> {
        let label = name.map_or_else(|| op.kind().as_str().to_string(), str::to_string);
        if let Some(n) = name {
            if self.node_names.contains(n) {
                return Err(GraphError::DuplicateName { name: n.to_string() });
            }
        }

        let mut types = Vec::with_capacity(inputs.len());
        for &id in inputs {
            types.push(self.tensor_type(id)?.clone());
        }
        let inferred = op
            .infer(&types)
            .map_err(|source: OpError| GraphError::InvalidNode {
                node: label.clone(),
                source,
            })?;

        if !outputs.is_empty() && outputs.len() != inferred.len() {
            return Err(GraphError::OutputCount {
                node: label,
                expected: inferred.len(),
                actual: outputs.len(),
            });
        }
        for (i, out) in outputs.iter().enumerate() {
            if self.tensor_names.contains_key(*out) || outputs[..i].contains(out) {
                return Err(GraphError::DuplicateName {
                    name: out.to_string(),
                });
            }
        }

        let node = NodeId(self.nodes.len());
        let ids: Vec<TensorId> = inferred
            .into_iter()
            .enumerate()
            .map(|(slot, ty)| {
                self.push_tensor(TensorDef {
                    name: outputs.get(slot).map(|s| s.to_string()),
                    ty,
                    origin: TensorOrigin::Node { node, slot },
                    data: None,
                })
            })
            .collect();
        tracing::trace!(node = %label, op = %op.kind(), outputs = ids.len(), "node added");
        if let Some(n) = name {
            self.node_names.insert(n.to_string());
        }
        self.nodes.push(NodeDef {
            name: name.map(str::to_string),
            op,
            inputs: inputs.to_vec(),
            outputs: ids.clone(),
        });
        Ok(ids)
    }

    /// Declares a tensor as a graph output. Marking twice is a no-op.
    pub fn mark_output(&mut self, id: TensorId) -> Result<(), GraphError> {
        self.tensor(id)?;
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        Ok(())
    }

    /// Finishes construction and transitions to the `Complete` state.
    ///
    /// # Checks
    /// - At least one output is declared.
    pub fn finish(self) -> Result<ModelGraph<Complete>, GraphError> {
        if self.outputs.is_empty() {
            return Err(GraphError::NoOutputs(self.name));
        }
        tracing::debug!(
            graph = %self.name,
            nodes = self.nodes.len(),
            tensors = self.tensors.len(),
            "graph finished"
        );
        Ok(ModelGraph {
            name: self.name,
            tensors: self.tensors,
            nodes: self.nodes,
            inputs: self.inputs,
            outputs: self.outputs,
            constants: self.constants,
            tensor_names: self.tensor_names,
            node_names: self.node_names,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Complete state ─────────────────────────────────────────────────

impl ModelGraph<Complete> {
    /// For each node, the nodes producing its inputs (deduplicated).
    pub fn node_dependencies(&self) -> Vec<Vec<usize>> {
        self.nodes
            .iter()
            .map(|n| {
                let mut deps: Vec<usize> = n
                    .inputs
                    .iter()
                    .filter_map(|&id| self.tensors[id.0].producer().map(NodeId::index))
                    .collect();
                deps.sort_unstable();
                deps.dedup();
                deps
            })
            .collect()
    }

    /// Nodes in dependency order, ties broken by insertion order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        Ok(topological_order(&self.node_dependencies())?
            .into_iter()
            .map(NodeId)
            .collect())
    }

    /// Number of nodes per operator kind.
    pub fn op_histogram(&self) -> BTreeMap<OpKind, usize> {
        let mut hist = BTreeMap::new();
        for node in &self.nodes {
            *hist.entry(node.kind()).or_insert(0) += 1;
        }
        hist
    }

    /// Total bytes of embedded constant data.
    pub fn constant_bytes(&self) -> usize {
        self.constants
            .iter()
            .filter_map(|&id| self.tensors[id.0].data.as_ref())
            .map(Tensor::size_bytes)
            .sum()
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        format!(
            "Graph '{}': {} nodes, {} inputs, {} outputs, {} constants ({:.2} KB)",
            self.name,
            self.nodes.len(),
            self.inputs.len(),
            self.outputs.len(),
            self.constants.len(),
            self.constant_bytes() as f64 / 1024.0,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> ModelGraph<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tensors(&self) -> &[TensorDef] {
        &self.tensors
    }

    pub fn nodes(&self) -> &[NodeDef] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    pub fn constants(&self) -> &[TensorId] {
        &self.constants
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the tensor behind a handle.
    pub fn tensor(&self, id: TensorId) -> Result<&TensorDef, GraphError> {
        self.tensors.get(id.0).ok_or(GraphError::UnknownTensor(id.0))
    }

    /// Returns the element type and shape behind a handle.
    pub fn tensor_type(&self, id: TensorId) -> Result<&TensorType, GraphError> {
        self.tensor(id).map(|t| &t.ty)
    }

    /// Returns the node behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&NodeDef> {
        self.nodes.get(id.0)
    }

    /// Looks up a tensor by name.
    pub fn lookup(&self, name: &str) -> Option<TensorId> {
        self.tensor_names.get(name).copied()
    }

    /// Iterates tensor handles in creation order.
    pub fn tensor_ids(&self) -> impl Iterator<Item = TensorId> + '_ {
        (0..self.tensors.len()).map(TensorId)
    }

    /// Iterates node handles in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Returns `true` if some node consumes `id`.
    pub fn is_consumed(&self, id: TensorId) -> bool {
        self.nodes.iter().any(|n| n.inputs.contains(&id))
    }
}

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} nodes):", self.name, self.nodes.len())?;
        let label = |id: &TensorId| {
            self.tensors[id.0]
                .name
                .clone()
                .unwrap_or_else(|| format!("%{}", id.0))
        };
        for (i, node) in self.nodes.iter().enumerate() {
            let ins: Vec<String> = node.inputs.iter().map(label).collect();
            let outs: Vec<String> = node
                .outputs
                .iter()
                .map(|id| format!("{}: {}", label(id), self.tensors[id.0].ty))
                .collect();
            writeln!(
                f,
                "  #{i} {} ({}) -> {}",
                node.kind(),
                ins.join(", "),
                outs.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Kahn's algorithm over per-node dependency lists.
///
/// `deps[i]` lists the nodes that must precede node `i`. Among ready nodes
/// the lowest index is emitted first, so an already ordered graph keeps its
/// order.
pub fn topological_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, GraphError> {
    let n = deps.len();
    let mut indegree = vec![0usize; n];
    let mut consumers = vec![Vec::new(); n];
    for (node, ds) in deps.iter().enumerate() {
        for &d in ds {
            if d >= n {
                continue;
            }
            indegree[node] += 1;
            consumers[d].push(node);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &c in &consumers[node] {
            indegree[c] -= 1;
            if indegree[c] == 0 {
                ready.push(Reverse(c));
            }
        }
    }

    if order.len() != n {
        return Err(GraphError::CyclicGraph {
            remaining: n - order.len(),
        });
    }
    Ok(order)
}
