// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! A strongly-typed computation-graph IR for neural-network inference.
//!
//! - [`OpKind`] / [`Operator`]: the closed operator catalog, each variant
//!   carrying its typed parameter record.
//! - [`Operator::infer`]: per-operator shape and type inference.
//! - [`ModelGraph`]: tensors and nodes in one arena, with a **type-state
//!   pattern** (`Building` → `Complete`).
//! - [`ErrorKind`]: the error taxonomy shared by the translation crates.
//!
//! # Example
//! ```
//! use model_ir::{ModelGraph, Operator, ops::UnaryOp};
//! use tensor_core::DType;
//!
//! let mut g = ModelGraph::new("tiny");
//! let x = g.add_input(Some("x"), DType::F32, [1, 16]).unwrap();
//! let y = g.add_node(Operator::Unary(UnaryOp::Relu), &[x]).unwrap()[0];
//! g.mark_output(y).unwrap();
//! let g = g.finish().unwrap();
//! println!("{}", g.summary());
//! ```

mod error;
pub mod graph;
pub mod ops;

pub use error::{ErrorKind, GraphError, OpError};
pub use graph::{
    topological_order, Building, Complete, GraphState, ModelGraph, NodeDef, NodeId, TensorDef,
    TensorId, TensorOrigin,
};
pub use ops::{OpKind, Operator, TensorType};
